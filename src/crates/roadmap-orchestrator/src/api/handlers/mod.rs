//! Endpoint handlers

pub mod health;
pub mod roadmaps;
pub mod stream;
pub mod tasks;

pub use health::health;
pub use roadmaps::{get_roadmap, retry_content, submit_roadmap};
pub use stream::task_stream;
pub use tasks::{cancel_task, get_task, list_tasks, review_task, task_logs};
