//! Node runners
//!
//! One module per graph node. A runner reads the workflow state, calls
//! its agent, persists through brain helpers and returns a [`NodeOutput`].
//! Runners hold no infrastructure logic: retries, timeouts, checkpoints
//! and branching all live in the executor.

pub mod content;
pub mod curriculum;
pub mod edit;
pub mod intent;
pub mod review;
pub mod validation;

use crate::model::TaskStatus;

/// What a runner produced
#[derive(Debug)]
pub enum NodeOutput {
    /// Node finished; the executor picks the next node
    Advance { details: serde_json::Value },
    /// Park the graph and wait for an external resume
    Suspend { reason: String },
    /// The node decided the task's terminal status (content generation)
    Terminal {
        status: TaskStatus,
        details: serde_json::Value,
    },
}
