//! Domain model
//!
//! Typed shapes shared by the agents, runners, persistence layer and API:
//! status enums, the roadmap tree, intent/validation/edit outputs and the
//! generated content artifacts.

pub mod content;
pub mod intent;
pub mod request;
pub mod roadmap;
pub mod status;
pub mod validation;

pub use content::{
    ContentOutcome, ContentStatistics, FailedPiece, Quiz, QuizQuestion, ResourceItem, ResourceSet,
    Tutorial,
};
pub use intent::IntentAnalysis;
pub use request::{GenerationRequest, LearningPreferences};
pub use roadmap::{Concept, Module, RoadmapFramework, Stage};
pub use status::{ContentKind, EditSource, OverallStatus, PieceStatus, ReviewDecision, TaskStatus};
pub use validation::{
    DimensionScore, EditInstructions, EditOutcome, IssueSeverity, ValidationIssue,
    ValidationResult,
};
