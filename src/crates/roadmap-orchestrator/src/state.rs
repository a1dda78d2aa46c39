//! Live step map
//!
//! Process-wide `task_id -> current live step` cache for O(1) status
//! reads from HTTP handlers. Soft state only: the task row and the
//! checkpoint remain authoritative.

use dashmap::DashMap;
use std::sync::Arc;

/// Shared map of running tasks to their live step
#[derive(Debug, Clone, Default)]
pub struct LiveStepMap {
    inner: Arc<DashMap<String, String>>,
}

impl LiveStepMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_live_step(&self, task_id: &str, step: &str) {
        self.inner.insert(task_id.to_string(), step.to_string());
    }

    pub fn get_live_step(&self, task_id: &str) -> Option<String> {
        self.inner.get(task_id).map(|entry| entry.value().clone())
    }

    pub fn clear(&self, task_id: &str) {
        self.inner.remove(task_id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let map = LiveStepMap::new();
        assert!(map.get_live_step("task-1").is_none());

        map.set_live_step("task-1", "intent_analysis");
        assert_eq!(map.get_live_step("task-1").as_deref(), Some("intent_analysis"));

        map.set_live_step("task-1", "curriculum_design");
        assert_eq!(
            map.get_live_step("task-1").as_deref(),
            Some("curriculum_design")
        );

        map.clear("task-1");
        assert!(map.get_live_step("task-1").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_tasks_are_independent() {
        let map = LiveStepMap::new();
        map.set_live_step("a", "intent_analysis");
        map.set_live_step("b", "content_generation");

        assert_eq!(map.len(), 2);
        map.clear("a");
        assert_eq!(map.get_live_step("b").as_deref(), Some("content_generation"));
    }
}
