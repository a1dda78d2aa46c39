//! In-memory checkpoint storage for development and testing
//!
//! Keeps only the latest checkpoint per task behind an `Arc<RwLock>`.
//! Data does not survive a restart; production deployments use
//! [`FileCheckpointStore`](crate::file::FileCheckpointStore) or a
//! database-backed implementation of the trait.

use crate::{
    error::{CheckpointError, Result},
    snapshot::TaskCheckpoint,
    traits::CheckpointStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory checkpoint store
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    storage: Arc<RwLock<HashMap<String, TaskCheckpoint>>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently holding a checkpoint
    pub async fn task_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Drop all checkpoints (test isolation)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, mut checkpoint: TaskCheckpoint) -> Result<u64> {
        if checkpoint.task_id.is_empty() {
            return Err(CheckpointError::Invalid("task_id is required".to_string()));
        }

        let mut storage = self.storage.write().await;
        let seq = storage
            .get(&checkpoint.task_id)
            .map(|prev| prev.seq + 1)
            .unwrap_or(1);
        checkpoint.seq = seq;
        storage.insert(checkpoint.task_id.clone(), checkpoint);
        Ok(seq)
    }

    async fn load(&self, task_id: &str) -> Result<Option<TaskCheckpoint>> {
        Ok(self.storage.read().await.get(task_id).cloned())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        self.storage.write().await.remove(task_id);
        Ok(())
    }
}
