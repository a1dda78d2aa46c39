//! Notification bus
//!
//! In-process pub/sub of progress events, one topic per task. Publishing
//! is non-blocking and best-effort: a slow subscriber lags and drops,
//! and recovery of missed events is log-based
//! (see [`replay`](crate::replay)), never bus-based.
//!
//! After a task's terminal event the topic is closed; nothing can be
//! published for that task again.

use crate::model::{ContentStatistics, TaskStatus};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

const TOPIC_CAPACITY: usize = 256;

/// Progress phase carried by `progress` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Started,
    Completed,
    Failed,
}

/// Events streamed to task subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Task status transition
    Status {
        status: TaskStatus,
        current_step: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        roadmap_id: Option<String>,
    },

    /// Node lifecycle progress
    Progress {
        step: String,
        status: ProgressPhase,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },

    /// One concept entered generation
    ConceptStart {
        concept_id: String,
        concept_name: String,
    },

    /// All three artifacts for a concept succeeded
    ConceptComplete {
        concept_id: String,
        concept_name: String,
    },

    /// At least one artifact for a concept failed
    ConceptFailed {
        concept_id: String,
        error: String,
        partial_failure: bool,
    },

    /// The graph suspended for review
    HumanReview { reason: String },

    /// Terminal success (possibly partial)
    Completed {
        roadmap_id: String,
        statistics: ContentStatistics,
    },

    /// Terminal failure
    Failed { error: String },
}

/// Per-task broadcast channel registry
#[derive(Debug, Clone, Default)]
pub struct NotificationBus {
    topics: Arc<DashMap<String, broadcast::Sender<TaskEvent>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to the task's topic; never blocks. Events are
    /// dropped when the topic is closed or was never subscribed, which is
    /// fine: missed history is recovered from execution logs.
    pub fn publish(&self, task_id: &str, event: TaskEvent) {
        if let Some(sender) = self.topics.get(task_id) {
            let _ = sender.send(event);
        }
    }

    /// Subscribe to a task's live events
    pub fn subscribe(&self, task_id: &str) -> broadcast::Receiver<TaskEvent> {
        self.topics
            .entry(task_id.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Tear a topic down after the terminal event
    pub fn close(&self, task_id: &str) {
        self.topics.remove(task_id);
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_order_is_preserved() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe("task-1");

        bus.publish(
            "task-1",
            TaskEvent::Progress {
                step: "intent_analysis".to_string(),
                status: ProgressPhase::Started,
                message: "started".to_string(),
                data: None,
            },
        );
        bus.publish(
            "task-1",
            TaskEvent::Progress {
                step: "intent_analysis".to_string(),
                status: ProgressPhase::Completed,
                message: "done".to_string(),
                data: None,
            },
        );

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            TaskEvent::Progress { status: ProgressPhase::Started, .. }
        ));
        assert!(matches!(
            second,
            TaskEvent::Progress { status: ProgressPhase::Completed, .. }
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_does_not_block() {
        let bus = NotificationBus::new();
        bus.publish(
            "task-1",
            TaskEvent::Failed {
                error: "boom".to_string(),
            },
        );
        // Late subscriber sees only what comes after it.
        let mut rx = bus.subscribe("task-1");
        bus.publish(
            "task-1",
            TaskEvent::Failed {
                error: "later".to_string(),
            },
        );
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, TaskEvent::Failed { error } if error == "later"));
    }

    #[tokio::test]
    async fn test_closed_topic_drops_events() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe("task-1");
        bus.close("task-1");

        bus.publish(
            "task-1",
            TaskEvent::Status {
                status: TaskStatus::Cancelled,
                current_step: None,
                roadmap_id: None,
            },
        );

        // The original receiver's channel was dropped with the topic.
        assert!(rx.recv().await.is_err());
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = TaskEvent::ConceptFailed {
            concept_id: "c2".to_string(),
            error: "quiz agent failed".to_string(),
            partial_failure: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "concept_failed");
        assert_eq!(json["partial_failure"], true);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = NotificationBus::new();
        let _a = bus.subscribe("a");
        let _b = bus.subscribe("b");
        assert_eq!(bus.topic_count(), 2);
        bus.close("a");
        assert_eq!(bus.topic_count(), 1);
    }
}
