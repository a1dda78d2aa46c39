//! Execution log row model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `execution_logs` row
///
/// Append-only. Rows for one task, ordered by `id`, are the source of
/// truth for post-hoc event replay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub id: i64,
    pub task_id: String,
    /// debug | info | success | warning | error
    pub level: String,
    /// workflow | agent | concept
    pub category: String,
    pub step: Option<String>,
    pub agent_name: Option<String>,
    pub message: String,
    /// Structured payload as JSON text
    pub details: String,
    pub duration_ms: Option<i64>,
    pub created_at: String,
}

impl ExecutionLogRow {
    /// Decode the details column, tolerating legacy or empty payloads
    pub fn details_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.details).unwrap_or(serde_json::Value::Null)
    }
}
