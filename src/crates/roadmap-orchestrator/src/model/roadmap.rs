//! Roadmap framework tree
//!
//! The structural tree (stages, modules, concepts) without generated
//! content. Produced by curriculum design, possibly rewritten by edits,
//! flattened by the content fan-out.

use serde::{Deserialize, Serialize};

/// Smallest learning unit; owns three content artifacts once generated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Unique within the roadmap
    pub concept_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Ordered group of concepts inside a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub module_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    pub concepts: Vec<Concept>,
}

/// Top-level phase of a roadmap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub modules: Vec<Module>,
    #[serde(default)]
    pub estimated_hours: f64,
}

/// The full structural tree plus totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapFramework {
    pub roadmap_id: String,
    pub title: String,
    pub stages: Vec<Stage>,
    pub total_concepts: u32,
    pub total_hours: f64,
    pub recommended_completion_weeks: u32,
}

impl RoadmapFramework {
    /// All concepts in stage/module/position order
    pub fn flatten_concepts(&self) -> Vec<&Concept> {
        self.stages
            .iter()
            .flat_map(|stage| stage.modules.iter())
            .flat_map(|module| module.concepts.iter())
            .collect()
    }

    pub fn concept_count(&self) -> usize {
        self.flatten_concepts().len()
    }

    /// Sanity checks applied to agent output before it is persisted
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.stages.is_empty() {
            return Err("roadmap has no stages".to_string());
        }
        let concepts = self.flatten_concepts();
        if concepts.is_empty() {
            return Err("roadmap has no concepts".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for concept in &concepts {
            if !seen.insert(concept.concept_id.as_str()) {
                return Err(format!("duplicate concept_id: {}", concept.concept_id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framework() -> RoadmapFramework {
        RoadmapFramework {
            roadmap_id: "rm-1".to_string(),
            title: "Learn Go".to_string(),
            stages: vec![Stage {
                stage_id: "s1".to_string(),
                name: "Foundations".to_string(),
                description: String::new(),
                modules: vec![Module {
                    module_id: "m1".to_string(),
                    name: "Syntax".to_string(),
                    description: String::new(),
                    learning_objectives: vec![],
                    concepts: vec![
                        Concept {
                            concept_id: "c1".to_string(),
                            name: "Variables".to_string(),
                            description: String::new(),
                            difficulty: "beginner".to_string(),
                            keywords: vec![],
                        },
                        Concept {
                            concept_id: "c2".to_string(),
                            name: "Functions".to_string(),
                            description: String::new(),
                            difficulty: "beginner".to_string(),
                            keywords: vec![],
                        },
                    ],
                }],
                estimated_hours: 8.0,
            }],
            total_concepts: 2,
            total_hours: 8.0,
            recommended_completion_weeks: 2,
        }
    }

    #[test]
    fn test_flatten_order() {
        let fw = framework();
        let ids: Vec<_> = fw.flatten_concepts().iter().map(|c| c.concept_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn test_validate_shape() {
        assert!(framework().validate_shape().is_ok());

        let mut empty = framework();
        empty.stages.clear();
        assert!(empty.validate_shape().is_err());

        let mut duplicated = framework();
        duplicated.stages[0].modules[0].concepts[1].concept_id = "c1".to_string();
        assert!(duplicated.validate_shape().unwrap_err().contains("duplicate"));
    }
}
