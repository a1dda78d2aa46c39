//! Task endpoint handlers

use crate::api::error::{ApiError, ApiResult};
use crate::api::{response, routes::AppState};
use crate::db::models::TaskRow;
use crate::db::repositories::{log_repo, task_repo};
use crate::model::ReviewDecision;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Task row plus the in-process live step
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: TaskRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_step: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// GET /api/v1/tasks/:task_id
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = task_repo::get(state.db.pool(), &task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task not found: {task_id}")))?;
    let live_step = state.executor.brain().live().get_live_step(&task_id);
    Ok(response::ok(TaskResponse { task, live_step }))
}

/// GET /api/v1/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let tasks = task_repo::list(state.db.pool(), query.status.as_deref()).await?;
    Ok(response::ok(tasks))
}

/// GET /api/v1/tasks/:task_id/logs
pub async fn task_logs(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<LogQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if task_repo::get(state.db.pool(), &task_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Task not found: {task_id}")));
    }
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let rows = log_repo::list(state.db.pool(), &task_id, query.category.as_deref(), limit).await?;
    Ok(response::ok(rows))
}

/// POST /api/v1/tasks/:task_id/cancel
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.executor.cancel(&task_id).await?;
    tracing::info!(%task_id, "task cancelled");
    Ok(response::accepted(json!({ "task_id": task_id, "status": "cancelled" })))
}

/// POST /api/v1/tasks/:task_id/review
pub async fn review_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let decision = match request.decision.as_str() {
        "approve" => ReviewDecision::Approve,
        "modify" => ReviewDecision::Modify,
        other => {
            return Err(ApiError::BadRequest(format!(
                "decision must be approve or modify, got {other:?}"
            )))
        }
    };

    state
        .executor
        .resume(&task_id, decision, request.feedback)
        .await?;
    tracing::info!(%task_id, decision = %request.decision, "review decision applied");
    Ok(response::accepted(json!({ "task_id": task_id })))
}
