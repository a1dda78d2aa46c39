//! Roadmap edit runner (R4)
//!
//! Rewrites the framework from validation findings or reviewer feedback.
//! The edit record persists the source and the round in effect so the
//! executor resumes the correct branch after a crash.

use crate::agents::{AgentError, AgentSet};
use crate::brain::WorkflowBrain;
use crate::error::{OrchestratorError, Result};
use crate::executor::graph::{NodeId, WorkflowState};
use crate::model::{EditInstructions, EditSource};
use crate::runners::NodeOutput;
use serde_json::json;

pub async fn run(
    brain: &WorkflowBrain,
    agents: &AgentSet,
    state: &mut WorkflowState,
) -> Result<NodeOutput> {
    let source = state.edit_source.ok_or_else(|| {
        OrchestratorError::InvalidState("edit node reached without an edit source".to_string())
    })?;
    let framework = state.framework()?.clone();

    let instructions = match source {
        EditSource::ValidationFailed => EditInstructions {
            source,
            issues: state.validation()?.issues.clone(),
            feedback: None,
        },
        EditSource::HumanReview => EditInstructions {
            source,
            issues: Vec::new(),
            feedback: state.review.as_ref().and_then(|review| review.feedback.clone()),
        },
    };

    let outcome = agents.editor.edit(&framework, &instructions).await?;
    outcome
        .framework
        .validate_shape()
        .map_err(AgentError::Malformed)?;
    if outcome.framework.roadmap_id != state.roadmap_id {
        return Err(AgentError::Malformed(format!(
            "editor changed roadmap_id to {}",
            outcome.framework.roadmap_id
        ))
        .into());
    }

    brain
        .save_edit(
            &state.task_id,
            &state.user_id,
            source,
            &outcome.framework,
            &outcome.modified_node_ids,
            state.validation_round,
        )
        .await?;
    brain
        .agent_log(
            &state.task_id,
            NodeId::RoadmapEdit,
            agents.editor.name(),
            "framework edited",
            json!({
                "edit_source": source.as_str(),
                "modified_nodes": outcome.modified_node_ids.len(),
            }),
        )
        .await?;

    let details = json!({
        "edit_source": source.as_str(),
        "modified_node_ids": outcome.modified_node_ids,
    });
    state.framework = Some(outcome.framework);
    // The decision that routed here is spent; validation runs next.
    state.edit_source = None;
    state.review = None;

    Ok(NodeOutput::Advance { details })
}
