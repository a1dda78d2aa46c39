//! Event replay from execution logs
//!
//! Subscribers that ask for history get past events reconstructed from
//! persisted log rows, then the live stream. The bus never buffers
//! history; this module is the bridge between the two.

use crate::bus::{ProgressPhase, TaskEvent};
use crate::db::models::ExecutionLogRow;

fn string_field(details: &serde_json::Value, key: &str) -> String {
    details
        .get(key)
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Derive the event stream a live subscriber would have seen, from the
/// chronologically ordered log rows of one task.
pub fn events_from_logs(rows: &[ExecutionLogRow]) -> Vec<TaskEvent> {
    let mut events = Vec::new();

    for row in rows {
        let details = row.details_json();
        let phase = details.get("phase").and_then(|value| value.as_str());

        match (row.category.as_str(), phase) {
            ("workflow", Some("started")) => {
                if let Some(step) = &row.step {
                    events.push(TaskEvent::Progress {
                        step: step.clone(),
                        status: ProgressPhase::Started,
                        message: row.message.clone(),
                        data: None,
                    });
                }
            }
            ("workflow", Some("completed")) => {
                if let Some(step) = &row.step {
                    events.push(TaskEvent::Progress {
                        step: step.clone(),
                        status: ProgressPhase::Completed,
                        message: row.message.clone(),
                        data: details.get("data").cloned(),
                    });
                }
            }
            ("workflow", Some("failed")) => {
                if let Some(step) = &row.step {
                    events.push(TaskEvent::Progress {
                        step: step.clone(),
                        status: ProgressPhase::Failed,
                        message: row.message.clone(),
                        data: None,
                    });
                }
                events.push(TaskEvent::Failed {
                    error: string_field(&details, "error"),
                });
            }
            ("concept", Some("started")) => {
                events.push(TaskEvent::ConceptStart {
                    concept_id: string_field(&details, "concept_id"),
                    concept_name: string_field(&details, "concept_name"),
                });
            }
            ("concept", Some("completed")) => {
                events.push(TaskEvent::ConceptComplete {
                    concept_id: string_field(&details, "concept_id"),
                    concept_name: string_field(&details, "concept_name"),
                });
            }
            ("concept", Some("failed")) => {
                events.push(TaskEvent::ConceptFailed {
                    concept_id: string_field(&details, "concept_id"),
                    error: string_field(&details, "error"),
                    partial_failure: details
                        .get("partial_failure")
                        .and_then(|value| value.as_bool())
                        .unwrap_or(false),
                });
            }
            _ => {}
        }
    }

    events
}
