//! Database row models
//!
//! Timestamps are RFC3339 strings (TEXT in SQLite); JSON payloads are
//! stored as TEXT and decoded at the repository boundary.

pub mod analysis;
pub mod content;
pub mod log;
pub mod roadmap;
pub mod task;

pub use analysis::{EditRecordRow, IntentAnalysisRow, ValidationResultRow};
pub use content::{QuizRow, ResourceRow, TutorialRow};
pub use log::ExecutionLogRow;
pub use roadmap::{ConceptMetadataRow, ConceptRow, ModuleRow, RoadmapRow, StageRow};
pub use task::TaskRow;
