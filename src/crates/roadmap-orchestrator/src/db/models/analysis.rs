//! Intent, validation and edit-record row models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `intent_analyses` row; the list columns are JSON arrays
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IntentAnalysisRow {
    pub task_id: String,
    pub parsed_goal: String,
    pub key_technologies: String,
    pub difficulty_profile: String,
    pub time_constraint: String,
    pub skill_gap_analysis: String,
    pub personalized_suggestions: String,
    pub created_at: String,
}

/// `validation_results` row; structured columns are JSON
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ValidationResultRow {
    pub id: i64,
    pub task_id: String,
    pub validation_round: i64,
    pub overall_score: f64,
    pub is_valid: i64,
    pub dimension_scores: String,
    pub issues: String,
    pub improvement_suggestions: String,
    pub validation_summary: String,
    pub created_at: String,
}

/// `edit_records` row
///
/// `round_policy` records how `validation_round` numbers are to be read
/// across edit cycles; this implementation always writes `continue`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditRecordRow {
    pub id: i64,
    pub task_id: String,
    pub edit_source: String,
    pub modified_node_ids: String,
    pub validation_round: i64,
    pub round_policy: String,
    pub created_at: String,
}
