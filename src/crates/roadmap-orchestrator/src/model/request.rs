//! Submission request types

use serde::{Deserialize, Serialize};

/// Learner preferences supplied with a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPreferences {
    /// Free-form goal, e.g. "Learn Go"
    pub learning_goal: String,

    /// Weekly time budget
    pub available_hours_per_week: u32,

    /// Self-assessed level, e.g. "beginner"
    pub current_level: String,

    /// Preferred content modes, e.g. ["text", "hands_on"]
    #[serde(default)]
    pub content_preference: Vec<String>,
}

/// One roadmap generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub user_id: String,
    pub preferences: LearningPreferences,
}

impl GenerationRequest {
    /// Validate the request before a task is created for it
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        if self.preferences.learning_goal.trim().is_empty() {
            return Err("learning_goal must not be empty".to_string());
        }
        if self.preferences.available_hours_per_week == 0 {
            return Err("available_hours_per_week must be positive".to_string());
        }
        Ok(())
    }
}
