//! Intent analysis output

use serde::{Deserialize, Serialize};

/// Structured interpretation of the user's request, produced once by the
/// intent node and read by every downstream node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub parsed_goal: String,
    pub key_technologies: Vec<String>,
    pub difficulty_profile: String,
    pub time_constraint: String,
    #[serde(default)]
    pub skill_gap_analysis: Vec<String>,
    #[serde(default)]
    pub personalized_suggestions: Vec<String>,
}
