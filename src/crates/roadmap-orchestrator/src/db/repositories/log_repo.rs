//! Execution log repository
//!
//! Append-only. Ties on `created_at` are broken by the autoincrement id,
//! which also gives replay its insertion order.

use crate::db::error::DbResult;
use crate::db::models::ExecutionLogRow;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E>(
    ex: E,
    task_id: &str,
    level: &str,
    category: &str,
    step: Option<&str>,
    agent_name: Option<&str>,
    message: &str,
    details: &serde_json::Value,
    duration_ms: Option<i64>,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO execution_logs
             (task_id, level, category, step, agent_name, message, details, duration_ms, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(level)
    .bind(category)
    .bind(step)
    .bind(agent_name)
    .bind(message)
    .bind(details.to_string())
    .bind(duration_ms)
    .bind(&now)
    .execute(ex)
    .await?;
    Ok(())
}

/// Most recent rows first, optionally filtered by category
pub async fn list<'e, E>(
    ex: E,
    task_id: &str,
    category: Option<&str>,
    limit: i64,
) -> DbResult<Vec<ExecutionLogRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = match category {
        Some(category) => {
            sqlx::query_as::<_, ExecutionLogRow>(
                "SELECT * FROM execution_logs
                 WHERE task_id = ? AND category = ?
                 ORDER BY id DESC LIMIT ?",
            )
            .bind(task_id)
            .bind(category)
            .bind(limit)
            .fetch_all(ex)
            .await?
        }
        None => {
            sqlx::query_as::<_, ExecutionLogRow>(
                "SELECT * FROM execution_logs WHERE task_id = ? ORDER BY id DESC LIMIT ?",
            )
            .bind(task_id)
            .bind(limit)
            .fetch_all(ex)
            .await?
        }
    };
    Ok(rows)
}

/// Oldest rows first, for event replay
pub async fn list_chronological<'e, E>(ex: E, task_id: &str) -> DbResult<Vec<ExecutionLogRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ExecutionLogRow>(
        "SELECT * FROM execution_logs WHERE task_id = ? ORDER BY id",
    )
    .bind(task_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::task_repo;
    use crate::db::DatabaseConnection;
    use serde_json::json;

    async fn db() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        task_repo::create(db.pool(), "task-1", "u1", "t").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_order() {
        let db = db().await;
        for step in ["intent_analysis", "curriculum_design"] {
            insert(
                db.pool(),
                "task-1",
                "info",
                "workflow",
                Some(step),
                None,
                &format!("{step} started"),
                &json!({"phase": "started"}),
                None,
            )
            .await
            .unwrap();
        }

        let recent = list(db.pool(), "task-1", None, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].step.as_deref(), Some("curriculum_design"));

        let chrono_order = list_chronological(db.pool(), "task-1").await.unwrap();
        assert_eq!(chrono_order[0].step.as_deref(), Some("intent_analysis"));
    }

    #[tokio::test]
    async fn test_category_filter_and_limit() {
        let db = db().await;
        for i in 0..5 {
            insert(
                db.pool(),
                "task-1",
                "info",
                if i % 2 == 0 { "workflow" } else { "concept" },
                None,
                None,
                "row",
                &json!({}),
                None,
            )
            .await
            .unwrap();
        }

        let concepts = list(db.pool(), "task-1", Some("concept"), 10).await.unwrap();
        assert_eq!(concepts.len(), 2);

        let limited = list(db.pool(), "task-1", None, 3).await.unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[tokio::test]
    async fn test_bad_level_rejected_by_schema() {
        let db = db().await;
        let err = insert(
            db.pool(),
            "task-1",
            "verbose",
            "workflow",
            None,
            None,
            "row",
            &json!({}),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::db::DatabaseError::ConstraintViolation(_)
        ));
    }
}
