//! Health check handler

use crate::api::error::{ApiError, ApiResult};
use crate::api::{response, routes::AppState};
use axum::extract::State;
use serde_json::json;

/// GET /health
pub async fn health(State(state): State<AppState>) -> ApiResult<impl axum::response::IntoResponse> {
    state
        .db
        .health_check()
        .await
        .map_err(|err| ApiError::InternalError(err.to_string()))?;
    Ok(response::ok(json!({ "status": "ok" })))
}
