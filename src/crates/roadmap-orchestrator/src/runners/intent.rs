//! Intent analysis runner (R1)

use crate::agents::AgentSet;
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
    let intent = agents.intent.analyze(&state.request).await?;

    // The submission handed out a provisional roadmap id; make it final.
    let roadmap_id = brain
        .ensure_unique_roadmap_id(&state.task_id, &state.roadmap_id)
        .await?;
    brain
        .save_intent_analysis(&state.task_id, &roadmap_id, &intent)
        .await?;
    brain
        .agent_log(
            &state.task_id,
            NodeId::IntentAnalysis,
            agents.intent.name(),
            "intent analysis produced",
            json!({
                "parsed_goal": intent.parsed_goal,
                "key_technologies": intent.key_technologies,
            }),
        )
        .await?;

    state.roadmap_id = roadmap_id.clone();
    state.intent = Some(intent);

    Ok(NodeOutput::Advance {
        details: json!({ "roadmap_id": roadmap_id }),
    })
}
