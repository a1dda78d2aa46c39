//! Checkpoint data structures
//!
//! [`TaskCheckpoint`] is the unit of persistence: an opaque JSON state
//! snapshot plus the routing information the executor needs on reload.
//! The state payload is deliberately untyped here so the store stays
//! decoupled from the executor's state shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker recorded when a task is suspended mid-graph
///
/// Present only while the task waits for an external resume call. The
/// `entered_at` timestamp lets the resuming side compute the full node
/// duration across the suspension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionMarker {
    /// Why the graph is parked (e.g. "human_review_required")
    pub reason: String,

    /// Node that requested the suspension
    pub node: String,

    /// When the node entered, before suspending
    pub entered_at: DateTime<Utc>,
}

/// Durable snapshot of one workflow task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCheckpoint {
    /// Task this checkpoint belongs to
    pub task_id: String,

    /// Store-assigned sequence number, strictly increasing per task
    pub seq: u64,

    /// Next node the executor should run, None once terminal
    pub next_node: Option<String>,

    /// Present while the task is suspended awaiting resume
    pub suspension: Option<SuspensionMarker>,

    /// Opaque executor state snapshot
    pub state: serde_json::Value,

    /// When this checkpoint was written
    pub saved_at: DateTime<Utc>,
}

impl TaskCheckpoint {
    /// Create a checkpoint ready for saving; the store assigns `seq`
    pub fn new(task_id: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            task_id: task_id.into(),
            seq: 0,
            next_node: None,
            suspension: None,
            state,
            saved_at: Utc::now(),
        }
    }

    /// Set the next node to run on reload
    pub fn with_next_node(mut self, node: impl Into<String>) -> Self {
        self.next_node = Some(node.into());
        self
    }

    /// Mark this checkpoint as suspended
    pub fn with_suspension(mut self, marker: SuspensionMarker) -> Self {
        self.suspension = Some(marker);
        self
    }

    /// Whether the task is parked waiting for a resume call
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let cp = TaskCheckpoint::new("task-1", json!({"round": 2}))
            .with_next_node("validation")
            .with_suspension(SuspensionMarker {
                reason: "human_review_required".to_string(),
                node: "human_review".to_string(),
                entered_at: Utc::now(),
            });

        assert_eq!(cp.task_id, "task-1");
        assert_eq!(cp.next_node.as_deref(), Some("validation"));
        assert!(cp.is_suspended());
        assert_eq!(cp.state["round"], 2);
    }

    #[test]
    fn test_round_trip() {
        let cp = TaskCheckpoint::new("task-1", json!({"step": "intent"}));
        let encoded = serde_json::to_string(&cp).unwrap();
        let decoded: TaskCheckpoint = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.task_id, "task-1");
        assert!(!decoded.is_suspended());
    }
}
