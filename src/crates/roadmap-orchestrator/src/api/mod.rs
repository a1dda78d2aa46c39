//! HTTP/WS API surface
//!
//! Thin axum layer over the executor and repositories: submissions, task
//! status and logs, review resume, cancellation, content retries and the
//! per-task event stream.

pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
