//! Agent trait seams
//!
//! One trait per node-facing capability, plus the three content
//! sub-agents. Implementations must be `Send + Sync`; the executor shares
//! one [`AgentSet`] across all running tasks.

use crate::error::ErrorClass;
use crate::model::{
    Concept, EditInstructions, EditOutcome, GenerationRequest, IntentAnalysis, Quiz,
    ResourceSet, RoadmapFramework, Tutorial, ValidationResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by agent implementations
#[derive(Debug, Error)]
pub enum AgentError {
    /// Transient upstream trouble (network, rate limits); worth retrying
    #[error("Transient agent failure: {0}")]
    Transient(String),

    /// The agent produced output that does not satisfy the contract
    #[error("Malformed agent output: {0}")]
    Malformed(String),

    /// Anything else; treated conservatively
    #[error("Agent failure: {0}")]
    Other(String),
}

impl AgentError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AgentError::Transient(_) => ErrorClass::Recoverable,
            AgentError::Malformed(_) => ErrorClass::Validation,
            AgentError::Other(_) => ErrorClass::Unknown,
        }
    }
}

/// Result type for agent calls
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Interprets the raw user request
#[async_trait]
pub trait IntentAnalyzer: Send + Sync {
    async fn analyze(&self, request: &GenerationRequest) -> AgentResult<IntentAnalysis>;

    fn name(&self) -> &'static str {
        "intent_analyzer"
    }
}

/// Designs the roadmap framework from an intent analysis
#[async_trait]
pub trait CurriculumDesigner: Send + Sync {
    async fn design(
        &self,
        request: &GenerationRequest,
        intent: &IntentAnalysis,
        roadmap_id: &str,
    ) -> AgentResult<RoadmapFramework>;

    fn name(&self) -> &'static str {
        "curriculum_designer"
    }
}

/// Scores the structural quality of a framework
#[async_trait]
pub trait StructureValidator: Send + Sync {
    async fn validate(
        &self,
        framework: &RoadmapFramework,
        round: u32,
    ) -> AgentResult<ValidationResult>;

    fn name(&self) -> &'static str {
        "structure_validator"
    }
}

/// Rewrites a framework from validation issues or reviewer feedback
#[async_trait]
pub trait RoadmapEditor: Send + Sync {
    async fn edit(
        &self,
        framework: &RoadmapFramework,
        instructions: &EditInstructions,
    ) -> AgentResult<EditOutcome>;

    fn name(&self) -> &'static str {
        "roadmap_editor"
    }
}

/// Writes the markdown tutorial for one concept
#[async_trait]
pub trait TutorialWriter: Send + Sync {
    async fn write_tutorial(&self, concept: &Concept, roadmap_title: &str)
        -> AgentResult<Tutorial>;

    fn name(&self) -> &'static str {
        "tutorial_writer"
    }
}

/// Curates external resources for one concept
#[async_trait]
pub trait ResourceCurator: Send + Sync {
    async fn curate(&self, concept: &Concept) -> AgentResult<ResourceSet>;

    fn name(&self) -> &'static str {
        "resource_curator"
    }
}

/// Writes the quiz for one concept
#[async_trait]
pub trait QuizWriter: Send + Sync {
    async fn write_quiz(&self, concept: &Concept) -> AgentResult<Quiz>;

    fn name(&self) -> &'static str {
        "quiz_writer"
    }
}

/// The full set of agents the executor drives
#[derive(Clone)]
pub struct AgentSet {
    pub intent: Arc<dyn IntentAnalyzer>,
    pub curriculum: Arc<dyn CurriculumDesigner>,
    pub validator: Arc<dyn StructureValidator>,
    pub editor: Arc<dyn RoadmapEditor>,
    pub tutorial: Arc<dyn TutorialWriter>,
    pub resources: Arc<dyn ResourceCurator>,
    pub quiz: Arc<dyn QuizWriter>,
}
