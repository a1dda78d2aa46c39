//! Execution logger
//!
//! Append-only structured log rows per task, one level below `tracing`:
//! these rows are persisted, user-visible over the API, and the single
//! source of truth for post-hoc event replay. Every node run gets exactly
//! one start row and one terminal row; the content node additionally logs
//! one start and one terminal row per concept.
//!
//! Rows are written directly against the pool rather than inside the
//! node's unit of work: an aborted transaction must not erase the trail
//! that explains it.

use crate::db::repositories::log_repo;
use crate::db::{DatabasePool, DbResult};
use serde_json::json;

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Log category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Workflow,
    Agent,
    Concept,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Workflow => "workflow",
            LogCategory::Agent => "agent",
            LogCategory::Concept => "concept",
        }
    }
}

/// Writer for per-task execution logs
#[derive(Debug, Clone)]
pub struct ExecutionLogger {
    pool: DatabasePool,
}

impl ExecutionLogger {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub async fn workflow_start(&self, task_id: &str, step: &str) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Info.as_str(),
            LogCategory::Workflow.as_str(),
            Some(step),
            None,
            &format!("{step} started"),
            &json!({"phase": "started"}),
            None,
        )
        .await
    }

    pub async fn workflow_complete(
        &self,
        task_id: &str,
        step: &str,
        duration_ms: i64,
        details: serde_json::Value,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Success.as_str(),
            LogCategory::Workflow.as_str(),
            Some(step),
            None,
            &format!("{step} completed"),
            &json!({"phase": "completed", "data": details}),
            Some(duration_ms),
        )
        .await
    }

    pub async fn workflow_failed(
        &self,
        task_id: &str,
        step: &str,
        error: &str,
        duration_ms: i64,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Error.as_str(),
            LogCategory::Workflow.as_str(),
            Some(step),
            None,
            &format!("{step} failed"),
            &json!({"phase": "failed", "error": error}),
            Some(duration_ms),
        )
        .await
    }

    pub async fn workflow_cancelled(&self, task_id: &str) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Warning.as_str(),
            LogCategory::Workflow.as_str(),
            None,
            None,
            "task cancelled",
            &json!({"phase": "cancelled"}),
            None,
        )
        .await
    }

    pub async fn agent(
        &self,
        task_id: &str,
        step: &str,
        agent_name: &str,
        message: &str,
        details: serde_json::Value,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Info.as_str(),
            LogCategory::Agent.as_str(),
            Some(step),
            Some(agent_name),
            message,
            &details,
            None,
        )
        .await
    }

    pub async fn concept_start(
        &self,
        task_id: &str,
        concept_id: &str,
        concept_name: &str,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Info.as_str(),
            LogCategory::Concept.as_str(),
            None,
            None,
            &format!("generating content for {concept_name}"),
            &json!({
                "phase": "started",
                "concept_id": concept_id,
                "concept_name": concept_name,
            }),
            None,
        )
        .await
    }

    pub async fn concept_complete(
        &self,
        task_id: &str,
        concept_id: &str,
        concept_name: &str,
        duration_ms: i64,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Success.as_str(),
            LogCategory::Concept.as_str(),
            None,
            None,
            &format!("content ready for {concept_name}"),
            &json!({
                "phase": "completed",
                "concept_id": concept_id,
                "concept_name": concept_name,
            }),
            Some(duration_ms),
        )
        .await
    }

    pub async fn concept_failed(
        &self,
        task_id: &str,
        concept_id: &str,
        concept_name: &str,
        error: &str,
        partial_failure: bool,
    ) -> DbResult<()> {
        log_repo::insert(
            &self.pool,
            task_id,
            LogLevel::Error.as_str(),
            LogCategory::Concept.as_str(),
            None,
            None,
            &format!("content failed for {concept_name}"),
            &json!({
                "phase": "failed",
                "concept_id": concept_id,
                "concept_name": concept_name,
                "error": error,
                "partial_failure": partial_failure,
            }),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{log_repo, task_repo};
    use crate::db::DatabaseConnection;

    async fn logger() -> (DatabaseConnection, ExecutionLogger) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        task_repo::create(db.pool(), "task-1", "u1", "t").await.unwrap();
        let logger = ExecutionLogger::new(db.pool().clone());
        (db, logger)
    }

    #[tokio::test]
    async fn test_start_terminal_pairing() {
        let (db, logger) = logger().await;
        logger.workflow_start("task-1", "intent_analysis").await.unwrap();
        logger
            .workflow_complete("task-1", "intent_analysis", 42, serde_json::json!({}))
            .await
            .unwrap();

        let rows = log_repo::list_chronological(db.pool(), "task-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].details_json()["phase"], "started");
        assert_eq!(rows[1].details_json()["phase"], "completed");
        assert_eq!(rows[1].duration_ms, Some(42));
        assert_eq!(rows[1].level, "success");
    }

    #[tokio::test]
    async fn test_failed_row_carries_error() {
        let (db, logger) = logger().await;
        logger.workflow_start("task-1", "curriculum_design").await.unwrap();
        logger
            .workflow_failed("task-1", "curriculum_design", "agent returned garbage", 10)
            .await
            .unwrap();

        let rows = log_repo::list(db.pool(), "task-1", Some("workflow"), 10)
            .await
            .unwrap();
        assert_eq!(rows[0].level, "error");
        assert_eq!(
            rows[0].details_json()["error"],
            "agent returned garbage"
        );
    }

    #[tokio::test]
    async fn test_concept_rows_use_concept_category() {
        let (db, logger) = logger().await;
        logger.concept_start("task-1", "c1", "Variables").await.unwrap();
        logger
            .concept_failed("task-1", "c1", "Variables", "quiz failed", true)
            .await
            .unwrap();

        let rows = log_repo::list(db.pool(), "task-1", Some("concept"), 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].details_json()["partial_failure"], true);
    }
}
