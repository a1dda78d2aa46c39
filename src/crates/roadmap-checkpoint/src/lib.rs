//! Checkpoint persistence for the roadmap workflow executor
//!
//! A checkpoint is the durable snapshot of one workflow task: the opaque
//! state the executor needs to pick up where it left off, the next node to
//! run, and an optional suspension marker when the task is parked waiting
//! for human review. The executor writes one checkpoint after every node
//! boundary; crash recovery and human-review resumption both start by
//! loading the latest checkpoint for a task.
//!
//! This crate provides:
//!
//! - [`CheckpointStore`] - the storage backend trait
//! - [`TaskCheckpoint`] / [`SuspensionMarker`] - the persisted shape
//! - [`MemoryCheckpointStore`] - in-process backend for tests and dev
//! - [`FileCheckpointStore`] - one-file-per-task backend with atomic writes
//!
//! Backends must preserve a total order of saves per task (the store
//! assigns a strictly increasing `seq`) and must never expose a torn
//! snapshot to readers; last writer wins.

pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{CheckpointError, Result};
pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use snapshot::{SuspensionMarker, TaskCheckpoint};
pub use traits::CheckpointStore;
