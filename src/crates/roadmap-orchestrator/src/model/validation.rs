//! Structural validation and edit outputs

use crate::model::roadmap::RoadmapFramework;
use crate::model::status::EditSource;
use serde::{Deserialize, Serialize};

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
}

/// One finding against the roadmap structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Node id or tree path the issue points at
    pub location: String,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Score for one of the five validation dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    /// 0..=100
    pub score: f64,
    pub rationale: String,
}

/// Output of one structural validation round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 0..=100
    pub overall_score: f64,
    pub dimension_scores: Vec<DimensionScore>,
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    /// 1-based round counter, incremented every time validation runs
    pub validation_round: u32,
    pub is_valid: bool,
    pub validation_summary: String,
}

impl ValidationResult {
    pub fn critical_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Critical)
    }
}

/// Instructions handed to the roadmap editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditInstructions {
    pub source: EditSource,
    /// Validation findings, when the edit was triggered by a failed round
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    /// Reviewer feedback, when the edit was requested by a human
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Output of the roadmap editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutcome {
    pub framework: RoadmapFramework,
    /// Tree node ids touched by the edit, marked "modified" downstream
    pub modified_node_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_issue_filter() {
        let result = ValidationResult {
            overall_score: 61.0,
            dimension_scores: vec![],
            issues: vec![
                ValidationIssue {
                    severity: IssueSeverity::Critical,
                    location: "s1/m1".to_string(),
                    issue: "module has no concepts".to_string(),
                    suggestion: None,
                },
                ValidationIssue {
                    severity: IssueSeverity::Warning,
                    location: "s2".to_string(),
                    issue: "stage is very long".to_string(),
                    suggestion: Some("split into two stages".to_string()),
                },
            ],
            improvement_suggestions: vec![],
            validation_round: 1,
            is_valid: false,
            validation_summary: "structure needs work".to_string(),
        };

        assert_eq!(result.critical_issues().count(), 1);
    }
}
