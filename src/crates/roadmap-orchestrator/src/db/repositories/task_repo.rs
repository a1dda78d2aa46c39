//! Task repository

use crate::db::error::DbResult;
use crate::db::models::TaskRow;
use crate::model::TaskStatus;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

/// Create a new task in `pending` state
pub async fn create<'e, E>(
    ex: E,
    task_id: &str,
    user_id: &str,
    title: &str,
) -> DbResult<TaskRow>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let row = sqlx::query_as::<_, TaskRow>(
        "INSERT INTO tasks (task_id, user_id, title, status, created_at, updated_at)
         VALUES (?, ?, ?, 'pending', ?, ?)
         RETURNING *",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(title)
    .bind(&now)
    .bind(&now)
    .fetch_one(ex)
    .await?;
    Ok(row)
}

/// Get a task by id
pub async fn get<'e, E>(ex: E, task_id: &str) -> DbResult<Option<TaskRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// Find the task owning a roadmap
pub async fn find_by_roadmap<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Option<TaskRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE roadmap_id = ?")
        .bind(roadmap_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// List tasks, newest first, optionally filtered by status
pub async fn list<'e, E>(ex: E, status: Option<&str>) -> DbResult<Vec<TaskRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, TaskRow>(
                "SELECT * FROM tasks WHERE status = ? ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(ex)
            .await?
        }
        None => {
            sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks ORDER BY created_at DESC")
                .fetch_all(ex)
                .await?
        }
    };
    Ok(rows)
}

/// Move a task into `processing` on the given step
pub async fn set_step_processing<'e, E>(ex: E, task_id: &str, step: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE tasks SET status = 'processing', current_step = ?, updated_at = ? WHERE task_id = ?",
    )
    .bind(step)
    .bind(&now)
    .bind(task_id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Update the status column only
pub async fn set_status<'e, E>(ex: E, task_id: &str, status: TaskStatus) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE task_id = ?")
        .bind(status.as_str())
        .bind(&now)
        .bind(task_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Link the roadmap produced for this task
pub async fn set_roadmap_id<'e, E>(ex: E, task_id: &str, roadmap_id: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE tasks SET roadmap_id = ?, updated_at = ? WHERE task_id = ?")
        .bind(roadmap_id)
        .bind(&now)
        .bind(task_id)
        .execute(ex)
        .await?;
    Ok(())
}

const NON_TERMINAL_GUARD: &str =
    "AND status NOT IN ('completed', 'partial_failure', 'failed', 'cancelled')";

/// Terminal failure: status, error message and step in one update.
/// Terminal statuses are absorbing, so a failure racing a cancellation
/// (or any other terminal write) is a no-op.
pub async fn mark_failed<'e, E>(ex: E, task_id: &str, error: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(&format!(
        "UPDATE tasks
         SET status = 'failed', error_message = ?, current_step = 'failed',
             updated_at = ?, completed_at = ?
         WHERE task_id = ? {NON_TERMINAL_GUARD}",
    ))
    .bind(error)
    .bind(&now)
    .bind(&now)
    .bind(task_id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Terminal success, partial failure or cancellation; absorbing like
/// `mark_failed`.
pub async fn mark_terminal<'e, E>(ex: E, task_id: &str, status: TaskStatus) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(&format!(
        "UPDATE tasks SET status = ?, updated_at = ?, completed_at = ?
         WHERE task_id = ? {NON_TERMINAL_GUARD}",
    ))
    .bind(status.as_str())
    .bind(&now)
    .bind(&now)
    .bind(task_id)
    .execute(ex)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseConnection;

    async fn db() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let created = create(db.pool(), "task-1", "u1", "Learn Go").await.unwrap();
        assert_eq!(created.status, "pending");

        let fetched = get(db.pool(), "task-1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Learn Go");
        assert_eq!(fetched.status(), Some(TaskStatus::Pending));
    }

    #[tokio::test]
    async fn test_step_processing() {
        let db = db().await;
        create(db.pool(), "task-1", "u1", "t").await.unwrap();
        set_step_processing(db.pool(), "task-1", "intent_analysis")
            .await
            .unwrap();

        let row = get(db.pool(), "task-1").await.unwrap().unwrap();
        assert_eq!(row.status, "processing");
        assert_eq!(row.current_step.as_deref(), Some("intent_analysis"));
    }

    #[tokio::test]
    async fn test_mark_failed() {
        let db = db().await;
        create(db.pool(), "task-1", "u1", "t").await.unwrap();
        mark_failed(db.pool(), "task-1", "agent exploded").await.unwrap();

        let row = get(db.pool(), "task-1").await.unwrap().unwrap();
        assert_eq!(row.status, "failed");
        assert_eq!(row.error_message.as_deref(), Some("agent exploded"));
        assert_eq!(row.current_step.as_deref(), Some("failed"));
        assert!(row.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let db = db().await;
        create(db.pool(), "task-1", "u1", "a").await.unwrap();
        create(db.pool(), "task-2", "u1", "b").await.unwrap();
        mark_terminal(db.pool(), "task-2", TaskStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(list(db.pool(), Some("pending")).await.unwrap().len(), 1);
        assert_eq!(list(db.pool(), None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_statuses_are_absorbing() {
        let db = db().await;
        create(db.pool(), "task-1", "u1", "t").await.unwrap();
        mark_terminal(db.pool(), "task-1", TaskStatus::Cancelled)
            .await
            .unwrap();

        mark_failed(db.pool(), "task-1", "late failure").await.unwrap();
        mark_terminal(db.pool(), "task-1", TaskStatus::Completed)
            .await
            .unwrap();

        let row = get(db.pool(), "task-1").await.unwrap().unwrap();
        assert_eq!(row.status, "cancelled");
        assert!(row.error_message.is_none());
    }

    #[tokio::test]
    async fn test_find_by_roadmap() {
        let db = db().await;
        create(db.pool(), "task-1", "u1", "t").await.unwrap();
        set_roadmap_id(db.pool(), "task-1", "rm-9").await.unwrap();

        let row = find_by_roadmap(db.pool(), "rm-9").await.unwrap().unwrap();
        assert_eq!(row.task_id, "task-1");
    }
}
