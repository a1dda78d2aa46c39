//! File-backed checkpoint storage
//!
//! One JSON file per task under a root directory. Writes go to a
//! temporary sibling and are moved into place with `rename`, so a reader
//! never observes a torn snapshot and the latest complete write wins.
//! This is the `local` backend from the runtime configuration.

use crate::{
    error::{CheckpointError, Result},
    snapshot::TaskCheckpoint,
    traits::CheckpointStore,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Checkpoint store persisting each task to `<root>/<task_id>.json`
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, task_id: &str) -> Result<PathBuf> {
        // Task ids are UUIDs in practice; reject anything that could
        // escape the root directory.
        if task_id.is_empty()
            || !task_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CheckpointError::Invalid(format!(
                "task_id not usable as a file name: {task_id:?}"
            )));
        }
        Ok(self.root.join(format!("{task_id}.json")))
    }

    async fn read_checkpoint(path: &Path) -> Result<Option<TaskCheckpoint>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, mut checkpoint: TaskCheckpoint) -> Result<u64> {
        let path = self.path_for(&checkpoint.task_id)?;

        let seq = Self::read_checkpoint(&path)
            .await?
            .map(|prev| prev.seq + 1)
            .unwrap_or(1);
        checkpoint.seq = seq;

        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&checkpoint)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(seq)
    }

    async fn load(&self, task_id: &str) -> Result<Option<TaskCheckpoint>> {
        let path = self.path_for(task_id)?;
        Self::read_checkpoint(&path).await
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        let path = self.path_for(task_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> (tempfile::TempDir, FileCheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let (_dir, store) = store().await;

        let seq = store
            .save(TaskCheckpoint::new("task-1", json!({"node": "content"})))
            .await
            .unwrap();
        assert_eq!(seq, 1);

        let loaded = store.load("task-1").await.unwrap().unwrap();
        assert_eq!(loaded.state["node"], "content");

        store.delete("task-1").await.unwrap();
        assert!(store.load("task-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seq_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileCheckpointStore::new(dir.path()).await.unwrap();
            store
                .save(TaskCheckpoint::new("task-1", json!({"n": 1})))
                .await
                .unwrap();
            store
                .save(TaskCheckpoint::new("task-1", json!({"n": 2})))
                .await
                .unwrap();
        }

        let reopened = FileCheckpointStore::new(dir.path()).await.unwrap();
        let seq = reopened
            .save(TaskCheckpoint::new("task-1", json!({"n": 3})))
            .await
            .unwrap();
        assert_eq!(seq, 3);
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let (dir, store) = store().await;
        store
            .save(TaskCheckpoint::new("task-1", json!({})))
            .await
            .unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["task-1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, store) = store().await;
        let err = store
            .save(TaskCheckpoint::new("../evil", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_dir, store) = store().await;
        store.delete("never-saved").await.unwrap();
    }
}
