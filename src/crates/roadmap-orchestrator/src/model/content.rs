//! Generated content artifacts
//!
//! Each concept owns up to three artifacts. Versions start at 1 and are
//! bumped on every retry so stale writes are distinguishable.

use crate::model::status::ContentKind;
use serde::{Deserialize, Serialize};

/// Sectioned markdown tutorial for one concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tutorial {
    pub concept_id: String,
    pub markdown: String,
    pub version: i64,
}

/// One curated external resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub title: String,
    pub summary: String,
}

/// Curated resource list for one concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSet {
    pub concept_id: String,
    pub items: Vec<ResourceItem>,
    pub version: i64,
}

/// One quiz question with choices and an explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: u32,
    pub explanation: String,
}

/// Quiz for one concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub concept_id: String,
    pub questions: Vec<QuizQuestion>,
    pub version: i64,
}

/// A sub-agent failure recorded against one concept artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedPiece {
    pub concept_id: String,
    pub kind: ContentKind,
    pub error: String,
}

/// Aggregate counters reported with the terminal `completed` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentStatistics {
    pub total_concepts: usize,
    pub completed_concepts: usize,
    pub partial_concepts: usize,
    pub failed_concepts: usize,
}

/// Everything the content fan-out produced for one task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentOutcome {
    pub tutorials: Vec<Tutorial>,
    pub resources: Vec<ResourceSet>,
    pub quizzes: Vec<Quiz>,
    pub failed: Vec<FailedPiece>,
    pub statistics: ContentStatistics,
}

impl ContentOutcome {
    /// Whether every artifact across all concepts succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
