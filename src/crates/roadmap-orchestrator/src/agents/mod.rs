//! Agent interfaces
//!
//! The orchestrator core never talks to an LLM directly; every node goes
//! through one of these traits. Production wiring plugs prompt-driven
//! implementations in; the [`scripted`] set is a deterministic stand-in
//! for local runs and tests.

pub mod scripted;
pub mod traits;

pub use scripted::ScriptedAgents;
pub use traits::{
    AgentError, AgentResult, AgentSet, CurriculumDesigner, IntentAnalyzer, QuizWriter,
    ResourceCurator, RoadmapEditor, StructureValidator, TutorialWriter,
};
