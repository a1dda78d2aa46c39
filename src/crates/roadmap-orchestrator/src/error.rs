//! Orchestrator error types and rollback/retry classification
//!
//! Every failure the executor can observe maps onto one [`ErrorClass`]:
//!
//! - `Recoverable` - transient (connection drop, pool exhaustion, agent
//!   timeout); the executor retries in-node, the unit of work rolls back
//!   only the active savepoint.
//! - `Validation` - the data is wrong (malformed agent output, violated
//!   invariant, constraint breach); never retried, surfaced upward.
//! - `System` - the process or store is unhealthy; the whole transaction
//!   is abandoned and the task fails.
//! - `Cancelled` - not an error; the task terminates as `cancelled`.
//! - `Unknown` - treated conservatively, like `System`.

use crate::agents::AgentError;
use crate::db::DatabaseError;
use roadmap_checkpoint::CheckpointError;
use thiserror::Error;

/// Classification driving retry and rollback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Recoverable,
    Validation,
    System,
    Cancelled,
    Unknown,
}

impl ErrorClass {
    /// Whether the enclosing transaction must be rolled back entirely
    /// (savepoint-level rollback is not enough).
    pub fn poisons_transaction(&self) -> bool {
        matches!(self, ErrorClass::System | ErrorClass::Unknown)
    }

    /// Whether the executor may retry the failed node
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Recoverable)
    }
}

/// Errors produced by the workflow core
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A node exceeded its soft timeout
    #[error("Node '{node}' timed out after {elapsed_ms}ms")]
    NodeTimeout { node: String, elapsed_ms: u64 },

    /// Workflow state violates an invariant (missing upstream output,
    /// illegal transition, unknown node name in a checkpoint)
    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    /// Referenced task does not exist
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The requested transition conflicts with the task's current status
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The task was cancelled while the node was running
    #[error("Task cancelled")]
    Cancelled,

    /// Process-level failure (corrupted snapshot, resource exhaustion)
    #[error("System error: {0}")]
    System(String),
}

impl OrchestratorError {
    /// Classify this error for retry and rollback decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            OrchestratorError::Database(db) => db.class(),
            OrchestratorError::Checkpoint(CheckpointError::Storage(_)) => ErrorClass::Recoverable,
            OrchestratorError::Checkpoint(CheckpointError::Serialization(_)) => ErrorClass::System,
            OrchestratorError::Checkpoint(_) => ErrorClass::Validation,
            OrchestratorError::Agent(agent) => agent.class(),
            OrchestratorError::NodeTimeout { .. } => ErrorClass::Recoverable,
            OrchestratorError::InvalidState(_)
            | OrchestratorError::TaskNotFound(_)
            | OrchestratorError::Conflict(_) => ErrorClass::Validation,
            OrchestratorError::Cancelled => ErrorClass::Cancelled,
            OrchestratorError::System(_) => ErrorClass::System,
        }
    }
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_recoverable() {
        let err = OrchestratorError::NodeTimeout {
            node: "content_generation".to_string(),
            elapsed_ms: 600_000,
        };
        assert_eq!(err.class(), ErrorClass::Recoverable);
        assert!(err.class().is_retryable());
        assert!(!err.class().poisons_transaction());
    }

    #[test]
    fn test_invalid_state_is_validation() {
        let err = OrchestratorError::InvalidState("missing intent analysis".to_string());
        assert_eq!(err.class(), ErrorClass::Validation);
        assert!(!err.class().is_retryable());
    }

    #[test]
    fn test_system_poisons_transaction() {
        let err = OrchestratorError::System("out of memory".to_string());
        assert!(err.class().poisons_transaction());
    }

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert_eq!(OrchestratorError::Cancelled.class(), ErrorClass::Cancelled);
        assert!(!OrchestratorError::Cancelled.class().is_retryable());
    }

    #[test]
    fn test_agent_transient_is_recoverable() {
        let err: OrchestratorError = AgentError::Transient("rate limited".to_string()).into();
        assert_eq!(err.class(), ErrorClass::Recoverable);
    }

    #[test]
    fn test_agent_malformed_is_validation() {
        let err: OrchestratorError = AgentError::Malformed("missing stages".to_string()).into();
        assert_eq!(err.class(), ErrorClass::Validation);
    }
}
