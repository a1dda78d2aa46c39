//! Content artifact row models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `tutorials` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorialRow {
    pub roadmap_id: String,
    pub concept_id: String,
    pub markdown: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// `resources` row; `items` is a JSON array of resource objects
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceRow {
    pub roadmap_id: String,
    pub concept_id: String,
    pub items: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// `quizzes` row; `questions` is a JSON array of question objects
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizRow {
    pub roadmap_id: String,
    pub concept_id: String,
    pub questions: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}
