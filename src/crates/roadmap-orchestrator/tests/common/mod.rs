//! Shared fixtures for the workflow integration tests

use async_trait::async_trait;
use parking_lot::Mutex;
use roadmap_checkpoint::MemoryCheckpointStore;
use roadmap_orchestrator::agents::*;
use roadmap_orchestrator::db::repositories::task_repo;
use roadmap_orchestrator::db::DatabaseConnection;
use roadmap_orchestrator::model::*;
use roadmap_orchestrator::{
    LiveStepMap, NotificationBus, RuntimeConfig, WorkflowBrain, WorkflowExecutor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Knobs for the scripted-but-faulty test agents
#[derive(Default)]
pub struct MockBehavior {
    /// Validator reports is_valid=false for rounds <= this
    pub invalid_rounds: u32,
    /// Quiz sub-agent fails for this concept id
    pub quiz_fail_concept: Option<String>,
    /// How many quiz calls fail before succeeding (None = always fail)
    pub quiz_fail_times: Option<usize>,
    /// Sleep inside each content sub-agent call
    pub content_delay: Option<Duration>,

    pub quiz_calls_failed: AtomicUsize,
    pub active_concepts: Mutex<HashMap<String, usize>>,
    pub max_active_concepts: AtomicUsize,
}

impl MockBehavior {
    fn enter_concept(&self, concept_id: &str) {
        let mut active = self.active_concepts.lock();
        *active.entry(concept_id.to_string()).or_insert(0) += 1;
        let count = active.values().filter(|n| **n > 0).count();
        self.max_active_concepts.fetch_max(count, Ordering::SeqCst);
    }

    fn leave_concept(&self, concept_id: &str) {
        let mut active = self.active_concepts.lock();
        if let Some(count) = active.get_mut(concept_id) {
            *count -= 1;
            if *count == 0 {
                active.remove(concept_id);
            }
        }
    }
}

/// Scripted agents plus fault injection and concurrency accounting
#[derive(Clone)]
pub struct MockAgents {
    pub behavior: Arc<MockBehavior>,
    inner: ScriptedAgents,
}

impl MockAgents {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(behavior),
            inner: ScriptedAgents,
        }
    }

    pub fn agent_set(&self) -> AgentSet {
        let agents = Arc::new(self.clone());
        AgentSet {
            intent: agents.clone(),
            curriculum: agents.clone(),
            validator: agents.clone(),
            editor: agents.clone(),
            tutorial: agents.clone(),
            resources: agents.clone(),
            quiz: agents,
        }
    }

    async fn content_call(&self, concept_id: &str) {
        self.behavior.enter_concept(concept_id);
        if let Some(delay) = self.behavior.content_delay {
            tokio::time::sleep(delay).await;
        }
        self.behavior.leave_concept(concept_id);
    }
}

#[async_trait]
impl IntentAnalyzer for MockAgents {
    async fn analyze(&self, request: &GenerationRequest) -> AgentResult<IntentAnalysis> {
        self.inner.analyze(request).await
    }
}

#[async_trait]
impl CurriculumDesigner for MockAgents {
    async fn design(
        &self,
        request: &GenerationRequest,
        intent: &IntentAnalysis,
        roadmap_id: &str,
    ) -> AgentResult<RoadmapFramework> {
        self.inner.design(request, intent, roadmap_id).await
    }
}

#[async_trait]
impl StructureValidator for MockAgents {
    async fn validate(
        &self,
        framework: &RoadmapFramework,
        round: u32,
    ) -> AgentResult<ValidationResult> {
        let mut result = self.inner.validate(framework, round).await?;
        if round <= self.behavior.invalid_rounds {
            result.is_valid = false;
            result.overall_score = 55.0;
            result.issues.push(ValidationIssue {
                severity: IssueSeverity::Critical,
                location: framework
                    .flatten_concepts()
                    .first()
                    .map(|c| c.concept_id.clone())
                    .unwrap_or_default(),
                issue: "progression gap between stages".to_string(),
                suggestion: Some("insert a bridging concept".to_string()),
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl RoadmapEditor for MockAgents {
    async fn edit(
        &self,
        framework: &RoadmapFramework,
        instructions: &EditInstructions,
    ) -> AgentResult<EditOutcome> {
        self.inner.edit(framework, instructions).await
    }
}

#[async_trait]
impl TutorialWriter for MockAgents {
    async fn write_tutorial(
        &self,
        concept: &Concept,
        roadmap_title: &str,
    ) -> AgentResult<Tutorial> {
        self.content_call(&concept.concept_id).await;
        self.inner.write_tutorial(concept, roadmap_title).await
    }
}

#[async_trait]
impl ResourceCurator for MockAgents {
    async fn curate(&self, concept: &Concept) -> AgentResult<ResourceSet> {
        self.content_call(&concept.concept_id).await;
        self.inner.curate(concept).await
    }
}

#[async_trait]
impl QuizWriter for MockAgents {
    async fn write_quiz(&self, concept: &Concept) -> AgentResult<Quiz> {
        self.content_call(&concept.concept_id).await;

        if self.behavior.quiz_fail_concept.as_deref() == Some(concept.concept_id.as_str()) {
            let failed_so_far = self.behavior.quiz_calls_failed.load(Ordering::SeqCst);
            let still_failing = match self.behavior.quiz_fail_times {
                None => true,
                Some(times) => failed_so_far < times,
            };
            if still_failing {
                self.behavior.quiz_calls_failed.fetch_add(1, Ordering::SeqCst);
                return Err(AgentError::Other("quiz generation exploded".to_string()));
            }
        }
        self.inner.write_quiz(concept).await
    }
}

/// Everything a scenario needs in one place
pub struct Harness {
    pub db: DatabaseConnection,
    pub executor: Arc<WorkflowExecutor>,
    pub bus: NotificationBus,
    pub checkpoints: Arc<MemoryCheckpointStore>,
    pub agents: MockAgents,
    pub cfg: Arc<RuntimeConfig>,
}

impl Harness {
    pub async fn new(behavior: MockBehavior) -> Self {
        Self::with_config(behavior, RuntimeConfig::default()).await
    }

    pub async fn with_config(behavior: MockBehavior, cfg: RuntimeConfig) -> Self {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();

        let cfg = Arc::new(cfg);
        let bus = NotificationBus::new();
        let brain = Arc::new(WorkflowBrain::new(
            db.clone(),
            bus.clone(),
            LiveStepMap::new(),
            cfg.clone(),
        ));
        let agents = MockAgents::new(behavior);
        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let executor = Arc::new(WorkflowExecutor::new(
            cfg.clone(),
            brain,
            Arc::new(agents.agent_set()),
            checkpoints.clone(),
        ));

        Self {
            db,
            executor,
            bus,
            checkpoints,
            agents,
            cfg,
        }
    }

    /// A fresh executor over the same database and checkpoint store, as
    /// if the process restarted.
    pub fn restarted(&self) -> Arc<WorkflowExecutor> {
        let brain = Arc::new(WorkflowBrain::new(
            self.db.clone(),
            self.bus.clone(),
            LiveStepMap::new(),
            self.cfg.clone(),
        ));
        Arc::new(WorkflowExecutor::new(
            self.cfg.clone(),
            brain,
            Arc::new(self.agents.agent_set()),
            self.checkpoints.clone(),
        ))
    }

    pub async fn task_status(&self, task_id: &str) -> String {
        task_repo::get(self.db.pool(), task_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    /// Poll until the task reaches the given status
    pub async fn wait_for_status(&self, task_id: &str, status: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        loop {
            if self.task_status(task_id).await == status {
                return;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "task {task_id} never reached {status}, currently {}",
                    self.task_status(task_id).await
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn request() -> GenerationRequest {
    GenerationRequest {
        user_id: "u1".to_string(),
        preferences: LearningPreferences {
            learning_goal: "Learn Go".to_string(),
            available_hours_per_week: 10,
            current_level: "beginner".to_string(),
            content_preference: vec!["text".to_string(), "hands_on".to_string()],
        },
    }
}
