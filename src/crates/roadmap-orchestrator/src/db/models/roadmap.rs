//! Roadmap tree row models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `roadmaps` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoadmapRow {
    pub roadmap_id: String,
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub total_concepts: i64,
    pub total_hours: f64,
    pub recommended_completion_weeks: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// `stages` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageRow {
    pub roadmap_id: String,
    pub stage_id: String,
    pub position: i64,
    pub name: String,
    pub description: String,
    pub estimated_hours: f64,
}

/// `modules` row; `learning_objectives` is a JSON array
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModuleRow {
    pub roadmap_id: String,
    pub module_id: String,
    pub stage_id: String,
    pub position: i64,
    pub name: String,
    pub description: String,
    pub learning_objectives: String,
}

/// `concepts` row; `keywords` is a JSON array
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConceptRow {
    pub roadmap_id: String,
    pub concept_id: String,
    pub module_id: String,
    pub position: i64,
    pub name: String,
    pub description: String,
    pub difficulty: String,
    pub keywords: String,
}

/// `concept_metadata` row: per-concept generation bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConceptMetadataRow {
    pub roadmap_id: String,
    pub concept_id: String,
    pub content_status: String,
    pub resources_status: String,
    pub quiz_status: String,
    pub overall_status: String,
    /// Set when a roadmap edit touched this concept
    pub modified: i64,
    pub last_error: Option<String>,
    pub updated_at: String,
}

impl ConceptMetadataRow {
    /// Typed piece statuses, defaulting to pending on unknown values
    pub fn piece_statuses(
        &self,
    ) -> (
        crate::model::PieceStatus,
        crate::model::PieceStatus,
        crate::model::PieceStatus,
    ) {
        use crate::model::PieceStatus;
        (
            PieceStatus::parse(&self.content_status).unwrap_or(PieceStatus::Pending),
            PieceStatus::parse(&self.resources_status).unwrap_or(PieceStatus::Pending),
            PieceStatus::parse(&self.quiz_status).unwrap_or(PieceStatus::Pending),
        )
    }
}
