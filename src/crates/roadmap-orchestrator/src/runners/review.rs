//! Human review runner (R5)
//!
//! Two-phase node. On first entry the task is parked in
//! `human_review_pending` and the graph suspends; the later resume call
//! injects the decision, clears the pending status and lets the executor
//! branch on it. The pre hook runs once at entry and the post hook once
//! at resume, so the node's terminal log spans the suspension.

use crate::agents::AgentSet;
use crate::brain::WorkflowBrain;
use crate::error::Result;
use crate::executor::graph::WorkflowState;
use crate::model::ReviewDecision;
use crate::runners::NodeOutput;
use serde_json::json;

pub async fn run(
    brain: &WorkflowBrain,
    _agents: &AgentSet,
    state: &mut WorkflowState,
) -> Result<NodeOutput> {
    match &state.review {
        None => {
            brain
                .update_task_to_pending_review(&state.task_id, &state.roadmap_id)
                .await?;
            Ok(NodeOutput::Suspend {
                reason: "human_review_required".to_string(),
            })
        }
        Some(review) => {
            brain.update_task_after_review(&state.task_id).await?;
            let decision = review.decision;
            Ok(NodeOutput::Advance {
                details: json!({
                    "decision": match decision {
                        ReviewDecision::Approve => "approve",
                        ReviewDecision::Modify => "modify",
                    },
                }),
            })
        }
    }
}
