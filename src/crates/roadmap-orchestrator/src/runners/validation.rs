//! Structure validation runner (R3)
//!
//! The round counter is owned by the executor state, not the agent: it
//! increments every time this node runs and continues across edit cycles.

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
    let round = state.validation_round + 1;
    let framework = state.framework()?.clone();

    let mut result = agents.validator.validate(&framework, round).await?;
    result.validation_round = round;

    brain.save_validation_result(&state.task_id, &result).await?;
    brain
        .agent_log(
            &state.task_id,
            NodeId::StructureValidation,
            agents.validator.name(),
            "validation scored",
            json!({
                "round": round,
                "is_valid": result.is_valid,
                "overall_score": result.overall_score,
                "critical_issues": result.critical_issues().count(),
            }),
        )
        .await?;

    let details = json!({
        "round": round,
        "is_valid": result.is_valid,
        "overall_score": result.overall_score,
    });
    state.validation_round = round;
    state.validation = Some(result);

    Ok(NodeOutput::Advance { details })
}
