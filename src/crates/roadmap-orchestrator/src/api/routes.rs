//! API route definitions

use crate::bus::NotificationBus;
use crate::db::DatabaseConnection;
use crate::executor::WorkflowExecutor;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub executor: Arc<WorkflowExecutor>,
    pub bus: NotificationBus,
}

/// Build the complete API router
pub fn create_router(
    db: DatabaseConnection,
    executor: Arc<WorkflowExecutor>,
    bus: NotificationBus,
) -> Router {
    let state = AppState { db, executor, bus };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/roadmaps", post(handlers::submit_roadmap))
        .route("/api/v1/roadmaps/:roadmap_id", get(handlers::get_roadmap))
        .route(
            "/api/v1/roadmaps/:roadmap_id/concepts/:concept_id/:kind/retry",
            post(handlers::retry_content),
        )
        .route("/api/v1/tasks", get(handlers::list_tasks))
        .route("/api/v1/tasks/:task_id", get(handlers::get_task))
        .route("/api/v1/tasks/:task_id/logs", get(handlers::task_logs))
        .route("/api/v1/tasks/:task_id/cancel", post(handlers::cancel_task))
        .route("/api/v1/tasks/:task_id/review", post(handlers::review_task))
        .route("/api/v1/tasks/:task_id/stream", get(handlers::task_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
