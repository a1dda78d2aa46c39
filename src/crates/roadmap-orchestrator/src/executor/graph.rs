//! Graph vocabulary
//!
//! The workflow is an explicit state machine: a [`NodeId`] enum, a
//! serializable [`WorkflowState`] snapshot threaded through the nodes,
//! and a [`StepOutcome`] returned by every advance.

use crate::error::{OrchestratorError, Result};
use crate::model::{
    ContentStatistics, EditSource, GenerationRequest, IntentAnalysis, ReviewDecision,
    RoadmapFramework, TaskStatus, ValidationResult,
};
use serde::{Deserialize, Serialize};

/// One node of the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    IntentAnalysis,
    CurriculumDesign,
    StructureValidation,
    RoadmapEdit,
    HumanReview,
    ContentGeneration,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::IntentAnalysis => "intent_analysis",
            NodeId::CurriculumDesign => "curriculum_design",
            NodeId::StructureValidation => "structure_validation",
            NodeId::RoadmapEdit => "roadmap_edit",
            NodeId::HumanReview => "human_review",
            NodeId::ContentGeneration => "content_generation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "intent_analysis" => Some(NodeId::IntentAnalysis),
            "curriculum_design" => Some(NodeId::CurriculumDesign),
            "structure_validation" => Some(NodeId::StructureValidation),
            "roadmap_edit" => Some(NodeId::RoadmapEdit),
            "human_review" => Some(NodeId::HumanReview),
            "content_generation" => Some(NodeId::ContentGeneration),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single advance of the state machine produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Run this node next
    Continue(NodeId),
    /// Park the task and return from the driving future
    Suspend { reason: String },
    /// The task reached an absorbing status
    Terminal(TaskStatus),
}

/// Review decision injected on resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub decision: ReviewDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Serializable snapshot of one task's progress through the graph
///
/// Node outputs are cached here so crash recovery resumes from the last
/// checkpoint without re-running any completed node (agent calls are not
/// deterministic; the cache is what makes replay reproducible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub request: GenerationRequest,
    pub roadmap_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<RoadmapFramework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,

    /// Rounds of validation run so far; continues across edit cycles
    #[serde(default)]
    pub validation_round: u32,

    /// Why the next edit runs, set by the branch that routes to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_source: Option<EditSource>,

    /// Reviewer decision, present only after a resume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewInput>,

    /// Content statistics once generation finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_statistics: Option<ContentStatistics>,
}

impl WorkflowState {
    pub fn new(
        task_id: impl Into<String>,
        roadmap_id: impl Into<String>,
        request: GenerationRequest,
    ) -> Self {
        let title = request.preferences.learning_goal.clone();
        Self {
            task_id: task_id.into(),
            user_id: request.user_id.clone(),
            title,
            request,
            roadmap_id: roadmap_id.into(),
            intent: None,
            framework: None,
            validation: None,
            validation_round: 0,
            edit_source: None,
            review: None,
            content_statistics: None,
        }
    }

    /// Encode for the checkpoint store
    pub fn to_snapshot(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|err| OrchestratorError::System(format!("state serialization failed: {err}")))
    }

    /// Decode from a checkpoint snapshot
    pub fn from_snapshot(snapshot: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(snapshot.clone())
            .map_err(|err| OrchestratorError::System(format!("corrupted state snapshot: {err}")))
    }

    pub fn framework(&self) -> Result<&RoadmapFramework> {
        self.framework
            .as_ref()
            .ok_or_else(|| OrchestratorError::InvalidState("roadmap framework missing".to_string()))
    }

    pub fn intent(&self) -> Result<&IntentAnalysis> {
        self.intent
            .as_ref()
            .ok_or_else(|| OrchestratorError::InvalidState("intent analysis missing".to_string()))
    }

    pub fn validation(&self) -> Result<&ValidationResult> {
        self.validation
            .as_ref()
            .ok_or_else(|| OrchestratorError::InvalidState("validation result missing".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LearningPreferences;

    fn state() -> WorkflowState {
        WorkflowState::new(
            "task-1",
            "rm-1",
            GenerationRequest {
                user_id: "u1".to_string(),
                preferences: LearningPreferences {
                    learning_goal: "Learn Go".to_string(),
                    available_hours_per_week: 10,
                    current_level: "beginner".to_string(),
                    content_preference: vec![],
                },
            },
        )
    }

    #[test]
    fn test_node_id_round_trip() {
        for node in [
            NodeId::IntentAnalysis,
            NodeId::CurriculumDesign,
            NodeId::StructureValidation,
            NodeId::RoadmapEdit,
            NodeId::HumanReview,
            NodeId::ContentGeneration,
        ] {
            assert_eq!(NodeId::parse(node.as_str()), Some(node));
        }
        assert_eq!(NodeId::parse("terminal"), None);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = state();
        state.validation_round = 2;
        state.edit_source = Some(EditSource::ValidationFailed);

        let snapshot = state.to_snapshot().unwrap();
        let restored = WorkflowState::from_snapshot(&snapshot).unwrap();

        assert_eq!(restored.task_id, "task-1");
        assert_eq!(restored.validation_round, 2);
        assert_eq!(restored.edit_source, Some(EditSource::ValidationFailed));
        assert!(restored.intent.is_none());
    }

    #[test]
    fn test_missing_upstream_output_is_invalid_state() {
        let state = state();
        assert!(matches!(
            state.framework().unwrap_err(),
            OrchestratorError::InvalidState(_)
        ));
    }
}
