//! Extensible checkpoint storage trait
//!
//! [`CheckpointStore`] is the abstraction the workflow executor persists
//! through. Implementations may be embedded (in-memory, local file) or
//! remote (a shared database); all must satisfy the same contract:
//!
//! - **Per-task total order** - `save` assigns the next strictly
//!   increasing `seq` for the task and returns it. Two saves for the same
//!   task never share a `seq`.
//! - **Atomic visibility** - a concurrent `load` observes either the
//!   previous snapshot or the new one, never a torn mix. Last writer wins.
//! - **Writer-per-task** - callers guarantee a single writer per task id,
//!   so stores do not need cross-writer conflict resolution.
//!
//! Implementations must be `Send + Sync`; the executor shares one store
//! across all running tasks.

use crate::{error::Result, snapshot::TaskCheckpoint};
use async_trait::async_trait;

/// Storage backend for workflow checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint, assigning the task's next sequence number
    ///
    /// The `seq` field on the passed checkpoint is ignored; the assigned
    /// value is returned.
    async fn save(&self, checkpoint: TaskCheckpoint) -> Result<u64>;

    /// Load the latest checkpoint for a task, or `None` if absent
    async fn load(&self, task_id: &str) -> Result<Option<TaskCheckpoint>>;

    /// Remove all checkpoint state for a task
    async fn delete(&self, task_id: &str) -> Result<()>;
}
