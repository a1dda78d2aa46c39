//! Graph executor
//!
//! Drives one task through the node graph:
//!
//! ```text
//! Intent -> Curriculum -> Validation -> [valid? or round >= MAX]
//!                                       |- no  -> Edit(validation_failed) -> Validation
//!                                       '- yes -> HumanReview -- approve --> Content -> Terminal
//!                                                            '-- modify --> Edit(human_review) -> Validation
//! ```
//!
//! Each advance wraps the runner in the brain's lifecycle hooks, applies
//! the node timeout and the recoverable-retry budget, writes a checkpoint
//! after the post hook, then branches. Human review suspends the driving
//! future; `resume` reloads the checkpoint and continues from inside the
//! review node. Cancellation is cooperative through a watch channel.
//!
//! A global semaphore caps concurrently running tasks; submissions past
//! the cap queue until a permit frees up.

use crate::agents::AgentSet;
use crate::brain::{NodeCtx, WorkflowBrain};
use crate::config::RuntimeConfig;
use crate::db::repositories::{roadmap_repo, task_repo};
use crate::error::{ErrorClass, OrchestratorError, Result};
use crate::executor::graph::{NodeId, ReviewInput, StepOutcome, WorkflowState};
use crate::executor::retry::RetryPolicy;
use crate::model::{
    Concept, ContentKind, EditSource, GenerationRequest, ReviewDecision, TaskStatus,
};
use crate::runners::{self, NodeOutput};
use dashmap::DashMap;
use roadmap_checkpoint::{CheckpointStore, SuspensionMarker, TaskCheckpoint};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};

/// The workflow executor; one instance per process
pub struct WorkflowExecutor {
    cfg: Arc<RuntimeConfig>,
    brain: Arc<WorkflowBrain>,
    agents: Arc<AgentSet>,
    checkpoints: Arc<dyn CheckpointStore>,
    running: DashMap<String, watch::Sender<bool>>,
    permits: Arc<Semaphore>,
}

impl WorkflowExecutor {
    pub fn new(
        cfg: Arc<RuntimeConfig>,
        brain: Arc<WorkflowBrain>,
        agents: Arc<AgentSet>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(cfg.max_active_tasks));
        Self {
            cfg,
            brain,
            agents,
            checkpoints,
            running: DashMap::new(),
            permits,
        }
    }

    pub fn brain(&self) -> &Arc<WorkflowBrain> {
        &self.brain
    }

    /// Whether a task's driving future is live in this process
    pub fn is_running(&self, task_id: &str) -> bool {
        self.running.contains_key(task_id)
    }

    // ---- public surface -------------------------------------------------

    /// Create a task and start driving it; returns (task_id, roadmap_id)
    pub async fn submit(self: &Arc<Self>, request: GenerationRequest) -> Result<(String, String)> {
        request
            .validate()
            .map_err(OrchestratorError::InvalidState)?;

        let task_id = uuid::Uuid::new_v4().to_string();
        let candidate = slugify(&request.preferences.learning_goal);
        let roadmap_id = self
            .brain
            .ensure_unique_roadmap_id(&task_id, &candidate)
            .await?;

        task_repo::create(
            self.brain.pool(),
            &task_id,
            &request.user_id,
            &request.preferences.learning_goal,
        )
        .await?;

        let state = WorkflowState::new(&task_id, &roadmap_id, request);
        self.spawn_drive(state, NodeId::IntentAnalysis, None);
        Ok((task_id, roadmap_id))
    }

    /// Resume a task parked in human review with the reviewer's decision
    pub async fn resume(
        self: &Arc<Self>,
        task_id: &str,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<()> {
        let task = task_repo::get(self.brain.pool(), task_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if task.status() != Some(TaskStatus::HumanReviewPending) {
            return Err(OrchestratorError::Conflict(format!(
                "task is {}, not awaiting review",
                task.status
            )));
        }

        // The decision can race the suspending future's final checkpoint
        // write; give the driver a moment to park before rejecting.
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        let checkpoint = loop {
            if !self.is_running(task_id) {
                if let Some(checkpoint) = self.checkpoints.load(task_id).await? {
                    if checkpoint.is_suspended() {
                        break checkpoint;
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(OrchestratorError::Conflict(
                    "task is not suspended".to_string(),
                ));
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        };
        let marker = checkpoint.suspension.clone().ok_or_else(|| {
            OrchestratorError::Conflict("checkpoint carries no suspension".to_string())
        })?;

        let mut state = WorkflowState::from_snapshot(&checkpoint.state)?;
        state.review = Some(ReviewInput { decision, feedback });

        let ctx = self
            .brain
            .resumed_ctx(task_id, NodeId::HumanReview, marker.entered_at);
        self.spawn_drive(state, NodeId::HumanReview, Some(ctx));
        Ok(())
    }

    /// Cooperative cancellation; terminal tasks cannot be cancelled
    pub async fn cancel(&self, task_id: &str) -> Result<()> {
        let task = task_repo::get(self.brain.pool(), task_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        let status = task
            .status()
            .ok_or_else(|| OrchestratorError::InvalidState("unknown task status".to_string()))?;
        if status.is_terminal() {
            return Err(OrchestratorError::Conflict(format!(
                "task already terminal ({status})"
            )));
        }

        self.brain.mark_task_cancelled(task_id).await?;
        if let Some(entry) = self.running.get(task_id) {
            let _ = entry.value().send(true);
        }
        Ok(())
    }

    /// Restart a crashed (not suspended) task from its last checkpoint
    ///
    /// Returns false when there is nothing to do: no checkpoint, a
    /// suspended task waiting for review, or an already-terminal task.
    pub async fn recover(self: &Arc<Self>, task_id: &str) -> Result<bool> {
        if self.is_running(task_id) {
            return Ok(false);
        }
        let Some(checkpoint) = self.checkpoints.load(task_id).await? else {
            return Ok(false);
        };
        if checkpoint.is_suspended() {
            return Ok(false);
        }
        let Some(next_node) = checkpoint.next_node.as_deref() else {
            return Ok(false);
        };
        let node = NodeId::parse(next_node).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("unknown node in checkpoint: {next_node}"))
        })?;

        let task = task_repo::get(self.brain.pool(), task_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if task.status().map(|status| status.is_terminal()).unwrap_or(true) {
            return Ok(false);
        }

        let state = WorkflowState::from_snapshot(&checkpoint.state)?;
        self.spawn_drive(state, node, None);
        Ok(true)
    }

    /// Schedule an out-of-band retry of one artifact for one concept
    pub async fn retry_content(
        self: &Arc<Self>,
        roadmap_id: &str,
        concept_id: &str,
        kind: ContentKind,
    ) -> Result<()> {
        let task = task_repo::find_by_roadmap(self.brain.pool(), roadmap_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(format!("roadmap {roadmap_id}")))?;
        match task.status() {
            Some(TaskStatus::Completed) | Some(TaskStatus::PartialFailure) => {}
            Some(other) => {
                return Err(OrchestratorError::Conflict(format!(
                    "content retry requires a finished roadmap, task is {other}"
                )))
            }
            None => {
                return Err(OrchestratorError::InvalidState(
                    "unknown task status".to_string(),
                ))
            }
        }

        let roadmap = roadmap_repo::get(self.brain.pool(), roadmap_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(format!("roadmap {roadmap_id}")))?;
        let row = roadmap_repo::concept(self.brain.pool(), roadmap_id, concept_id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::TaskNotFound(format!("concept {concept_id} in {roadmap_id}"))
            })?;
        let concept = Concept {
            concept_id: row.concept_id,
            name: row.name,
            description: row.description,
            difficulty: row.difficulty,
            keywords: serde_json::from_str(&row.keywords).unwrap_or_default(),
        };

        let brain = self.brain.clone();
        let agents = self.agents.clone();
        let task_id = task.task_id;
        let roadmap_id = roadmap_id.to_string();
        let title = roadmap.title;
        tokio::spawn(async move {
            if let Err(err) = runners::content::retry_piece(
                brain,
                agents,
                task_id.clone(),
                roadmap_id,
                title,
                concept,
                kind,
            )
            .await
            {
                tracing::error!(task_id = %task_id, %err, "content retry failed");
            }
        });
        Ok(())
    }

    // ---- driving loop ---------------------------------------------------

    fn spawn_drive(
        self: &Arc<Self>,
        state: WorkflowState,
        start: NodeId,
        resume_ctx: Option<NodeCtx>,
    ) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task_id = state.task_id.clone();
        self.running.insert(task_id.clone(), cancel_tx);

        let executor = self.clone();
        tokio::spawn(async move {
            let mut cancel_rx = cancel_rx;
            // A task cancelled while queued behind the active-task cap
            // must not wait for a permit to notice.
            let _permit = tokio::select! {
                permit = executor.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        executor.running.remove(&task_id);
                        return;
                    }
                },
                _ = cancel_rx.changed() => {
                    executor.running.remove(&task_id);
                    return;
                }
            };
            if *cancel_rx.borrow() {
                executor.running.remove(&task_id);
                return;
            }

            let result = executor.drive(state, start, resume_ctx, cancel_rx).await;
            executor.running.remove(&task_id);
            if let Err(err) = result {
                tracing::error!(task_id = %task_id, %err, "workflow terminated with error");
            }
        });
    }

    async fn drive(
        self: &Arc<Self>,
        mut state: WorkflowState,
        mut node: NodeId,
        mut resume_ctx: Option<NodeCtx>,
        cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            if *cancel.borrow() {
                self.brain.live().clear(&state.task_id);
                return Ok(());
            }
            match self
                .execute_node(node, &mut state, resume_ctx.take(), &cancel)
                .await?
            {
                StepOutcome::Continue(next) => node = next,
                StepOutcome::Suspend { reason } => {
                    tracing::info!(task_id = %state.task_id, %reason, "workflow suspended");
                    return Ok(());
                }
                StepOutcome::Terminal(status) => {
                    tracing::info!(task_id = %state.task_id, %status, "workflow finished");
                    return Ok(());
                }
            }
        }
    }

    /// Run one node under the lifecycle hooks, checkpoint, and branch
    async fn execute_node(
        self: &Arc<Self>,
        node: NodeId,
        state: &mut WorkflowState,
        resume_ctx: Option<NodeCtx>,
        cancel: &watch::Receiver<bool>,
    ) -> Result<StepOutcome> {
        let ctx = match resume_ctx {
            Some(ctx) => ctx,
            None => self.brain.begin_node(&state.task_id, node).await?,
        };

        match self.run_node_with_retry(node, state, cancel).await {
            Ok(NodeOutput::Advance { details }) => {
                self.brain.finish_node(&ctx, details).await?;
                let next = self.next_after(node, state)?;
                self.save_checkpoint(state, Some(next), None).await?;
                Ok(StepOutcome::Continue(next))
            }
            Ok(NodeOutput::Suspend { reason }) => {
                let marker = SuspensionMarker {
                    reason: reason.clone(),
                    node: node.as_str().to_string(),
                    entered_at: ctx.started_at,
                };
                self.save_checkpoint(state, Some(node), Some(marker)).await?;
                Ok(StepOutcome::Suspend { reason })
            }
            Ok(NodeOutput::Terminal { status, details }) => {
                self.brain.finish_node(&ctx, details).await?;
                self.save_checkpoint(state, None, None).await?;
                self.brain.live().clear(&state.task_id);
                self.brain.bus().close(&state.task_id);
                Ok(StepOutcome::Terminal(status))
            }
            Err(err) if err.class() == ErrorClass::Cancelled => {
                self.brain.live().clear(&state.task_id);
                Ok(StepOutcome::Terminal(TaskStatus::Cancelled))
            }
            Err(err) => {
                self.brain.fail_node(&ctx, &err).await?;
                self.brain.bus().close(&state.task_id);
                Err(err)
            }
        }
    }

    /// Node timeout plus the recoverable-retry budget around one runner
    async fn run_node_with_retry(
        self: &Arc<Self>,
        node: NodeId,
        state: &mut WorkflowState,
        cancel: &watch::Receiver<bool>,
    ) -> Result<NodeOutput> {
        let timeout = match node {
            NodeId::ContentGeneration => self.cfg.node_timeout_content,
            _ => self.cfg.node_timeout_default,
        };
        let policy = RetryPolicy::default();
        let mut retries = 0usize;

        loop {
            let error = match tokio::time::timeout(timeout, self.run_node(node, state, cancel)).await
            {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(err)) => err,
                Err(_) => OrchestratorError::NodeTimeout {
                    node: node.as_str().to_string(),
                    elapsed_ms: timeout.as_millis() as u64,
                },
            };

            let was_timeout = matches!(error, OrchestratorError::NodeTimeout { .. });
            let class = error.class();
            if class == ErrorClass::Cancelled || !class.is_retryable() {
                return Err(error);
            }
            if !policy.allows(retries, was_timeout) {
                return Err(error);
            }

            tracing::warn!(
                task_id = %state.task_id,
                node = node.as_str(),
                %error,
                retry = retries + 1,
                "node failed, retrying"
            );
            tokio::time::sleep(policy.delay(retries)).await;
            retries += 1;
        }
    }

    async fn run_node(
        self: &Arc<Self>,
        node: NodeId,
        state: &mut WorkflowState,
        cancel: &watch::Receiver<bool>,
    ) -> Result<NodeOutput> {
        match node {
            NodeId::IntentAnalysis => runners::intent::run(&self.brain, &self.agents, state).await,
            NodeId::CurriculumDesign => {
                runners::curriculum::run(&self.brain, &self.agents, state).await
            }
            NodeId::StructureValidation => {
                runners::validation::run(&self.brain, &self.agents, state).await
            }
            NodeId::RoadmapEdit => runners::edit::run(&self.brain, &self.agents, state).await,
            NodeId::HumanReview => runners::review::run(&self.brain, &self.agents, state).await,
            NodeId::ContentGeneration => {
                runners::content::run(
                    self.brain.clone(),
                    self.agents.clone(),
                    state,
                    cancel.clone(),
                )
                .await
            }
        }
    }

    /// Branch selection after a node advanced
    fn next_after(&self, node: NodeId, state: &mut WorkflowState) -> Result<NodeId> {
        match node {
            NodeId::IntentAnalysis => Ok(NodeId::CurriculumDesign),
            NodeId::CurriculumDesign => Ok(NodeId::StructureValidation),
            NodeId::StructureValidation => {
                let validation = state.validation()?;
                if validation.is_valid || state.validation_round >= self.cfg.max_rounds {
                    Ok(NodeId::HumanReview)
                } else {
                    state.edit_source = Some(EditSource::ValidationFailed);
                    Ok(NodeId::RoadmapEdit)
                }
            }
            NodeId::RoadmapEdit => Ok(NodeId::StructureValidation),
            NodeId::HumanReview => {
                let review = state.review.as_ref().ok_or_else(|| {
                    OrchestratorError::InvalidState(
                        "review node advanced without a decision".to_string(),
                    )
                })?;
                match review.decision {
                    ReviewDecision::Approve => Ok(NodeId::ContentGeneration),
                    ReviewDecision::Modify => {
                        state.edit_source = Some(EditSource::HumanReview);
                        Ok(NodeId::RoadmapEdit)
                    }
                }
            }
            NodeId::ContentGeneration => Err(OrchestratorError::InvalidState(
                "content generation is terminal".to_string(),
            )),
        }
    }

    async fn save_checkpoint(
        &self,
        state: &WorkflowState,
        next_node: Option<NodeId>,
        suspension: Option<SuspensionMarker>,
    ) -> Result<()> {
        let mut checkpoint = TaskCheckpoint::new(&state.task_id, state.to_snapshot()?);
        if let Some(node) = next_node {
            checkpoint = checkpoint.with_next_node(node.as_str());
        }
        if let Some(marker) = suspension {
            checkpoint = checkpoint.with_suspension(marker);
        }
        self.checkpoints.save(checkpoint).await?;
        Ok(())
    }
}

fn slugify(goal: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in goal.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "roadmap".to_string()
    } else {
        format!("{slug}-roadmap")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Learn Go"), "learn-go-roadmap");
        assert_eq!(slugify("  Rust!! (async) "), "rust-async-roadmap");
        assert_eq!(slugify("???"), "roadmap");
    }
}
