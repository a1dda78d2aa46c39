//! Task row model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One generation run as persisted in the `tasks` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    /// Unique task identifier (UUID string)
    pub task_id: String,

    /// Owning user
    pub user_id: String,

    /// Display title derived from the learning goal
    pub title: String,

    /// Lifecycle status, see `model::TaskStatus`
    pub status: String,

    /// Node currently (or last) executing
    pub current_step: Option<String>,

    /// Roadmap owned by this task, set once intent analysis persists
    pub roadmap_id: Option<String>,

    /// Human-readable failure description when status is `failed`
    pub error_message: Option<String>,

    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl TaskRow {
    /// Typed view of the status column
    pub fn status(&self) -> Option<crate::model::TaskStatus> {
        crate::model::TaskStatus::parse(&self.status)
    }
}
