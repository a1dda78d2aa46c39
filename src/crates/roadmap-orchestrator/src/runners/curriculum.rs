//! Curriculum design runner (R2)

use crate::agents::{AgentError, AgentSet};
use crate::brain::WorkflowBrain;
use crate::error::Result;
use crate::executor::graph::{NodeId, WorkflowState};
use crate::runners::NodeOutput;
use serde_json::json;

pub async fn run(
    brain: &WorkflowBrain,
    agents: &AgentSet,
    state: &mut WorkflowState,
) -> Result<NodeOutput> {
    let intent = state.intent()?.clone();
    let framework = agents
        .curriculum
        .design(&state.request, &intent, &state.roadmap_id)
        .await?;

    framework
        .validate_shape()
        .map_err(AgentError::Malformed)?;
    if framework.roadmap_id != state.roadmap_id {
        return Err(AgentError::Malformed(format!(
            "designer changed roadmap_id to {}",
            framework.roadmap_id
        ))
        .into());
    }

    brain
        .save_roadmap_framework(&state.task_id, &state.user_id, &framework)
        .await?;
    brain
        .agent_log(
            &state.task_id,
            NodeId::CurriculumDesign,
            agents.curriculum.name(),
            "framework designed",
            json!({
                "stages": framework.stages.len(),
                "concepts": framework.concept_count(),
            }),
        )
        .await?;

    let details = json!({
        "stages": framework.stages.len(),
        "concepts": framework.concept_count(),
    });
    state.framework = Some(framework);

    Ok(NodeOutput::Advance { details })
}
