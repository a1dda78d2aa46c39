//! Database-backed checkpoint store
//!
//! Implements the checkpoint trait over the `checkpoints` table; selected
//! with `CHECKPOINT_BACKEND=remote` so executor state survives wherever
//! the relational database lives. One row per task, replaced on save
//! inside a single statement.

use crate::db::DatabasePool;
use async_trait::async_trait;
use chrono::Utc;
use roadmap_checkpoint::{CheckpointError, CheckpointStore, SuspensionMarker, TaskCheckpoint};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct CheckpointRecord {
    task_id: String,
    seq: i64,
    next_node: Option<String>,
    suspension: Option<String>,
    state: String,
    saved_at: String,
}

/// Checkpoint store persisting into the orchestrator database
#[derive(Debug, Clone)]
pub struct DbCheckpointStore {
    pool: DatabasePool,
}

impl DbCheckpointStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn storage_err(err: sqlx::Error) -> CheckpointError {
    CheckpointError::Storage(err.to_string())
}

#[async_trait]
impl CheckpointStore for DbCheckpointStore {
    async fn save(&self, mut checkpoint: TaskCheckpoint) -> roadmap_checkpoint::Result<u64> {
        if checkpoint.task_id.is_empty() {
            return Err(CheckpointError::Invalid("task_id is required".to_string()));
        }

        checkpoint.saved_at = Utc::now();
        let suspension = checkpoint
            .suspension
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let state = checkpoint.state.to_string();

        // seq assignment and replacement in one statement keeps the write
        // atomic for readers.
        let (seq,): (i64,) = sqlx::query_as(
            "INSERT INTO checkpoints (task_id, seq, next_node, suspension, state, saved_at)
             VALUES (?, 1, ?, ?, ?, ?)
             ON CONFLICT (task_id) DO UPDATE SET
                 seq = checkpoints.seq + 1,
                 next_node = excluded.next_node,
                 suspension = excluded.suspension,
                 state = excluded.state,
                 saved_at = excluded.saved_at
             RETURNING seq",
        )
        .bind(&checkpoint.task_id)
        .bind(&checkpoint.next_node)
        .bind(&suspension)
        .bind(&state)
        .bind(checkpoint.saved_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(seq as u64)
    }

    async fn load(&self, task_id: &str) -> roadmap_checkpoint::Result<Option<TaskCheckpoint>> {
        let record = sqlx::query_as::<_, CheckpointRecord>(
            "SELECT * FROM checkpoints WHERE task_id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(record) = record else {
            return Ok(None);
        };

        let suspension: Option<SuspensionMarker> = record
            .suspension
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let saved_at = record
            .saved_at
            .parse()
            .map_err(|err| CheckpointError::Storage(format!("bad saved_at column: {err}")))?;

        Ok(Some(TaskCheckpoint {
            task_id: record.task_id,
            seq: record.seq as u64,
            next_node: record.next_node,
            suspension,
            state: serde_json::from_str(&record.state)?,
            saved_at,
        }))
    }

    async fn delete(&self, task_id: &str) -> roadmap_checkpoint::Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
