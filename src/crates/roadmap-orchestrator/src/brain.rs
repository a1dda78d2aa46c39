//! Workflow brain
//!
//! The unified coordinator every node execution goes through. It owns the
//! lifecycle hooks around a node (pre, post, error), the transactional
//! persistence helpers the runners call, and the fan-out of logs, live
//! step updates and bus events. Runners never touch the database, logger
//! or bus directly.
//!
//! Every helper runs in its own unit of work and is idempotent under node
//! re-execution after crash recovery: writes are keyed on task/roadmap
//! ids and upserted.

use crate::bus::{NotificationBus, ProgressPhase, TaskEvent};
use crate::config::RuntimeConfig;
use crate::db::repositories::{analysis_repo, content_repo, roadmap_repo, task_repo};
use crate::db::{DatabaseConnection, DatabasePool, UnitOfWork};
use crate::error::{OrchestratorError, Result};
use crate::executor::graph::NodeId;
use crate::logging::ExecutionLogger;
use crate::model::{
    Concept, ContentKind, ContentOutcome, ContentStatistics, EditSource, IntentAnalysis,
    PieceStatus, RoadmapFramework, TaskStatus, ValidationResult,
};
use crate::state::LiveStepMap;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

/// Context handed out by the pre hook and consumed by the post/error hook
#[derive(Debug, Clone)]
pub struct NodeCtx {
    pub task_id: String,
    pub node: NodeId,
    /// Wall-clock start; durations span suspensions, so wall clock it is
    pub started_at: DateTime<Utc>,
}

impl NodeCtx {
    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0)
    }
}

/// The unified node coordinator
pub struct WorkflowBrain {
    db: DatabaseConnection,
    logger: ExecutionLogger,
    bus: NotificationBus,
    live: LiveStepMap,
    cfg: Arc<RuntimeConfig>,
}

impl WorkflowBrain {
    pub fn new(
        db: DatabaseConnection,
        bus: NotificationBus,
        live: LiveStepMap,
        cfg: Arc<RuntimeConfig>,
    ) -> Self {
        let logger = ExecutionLogger::new(db.pool().clone());
        Self {
            db,
            logger,
            bus,
            live,
            cfg,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        self.db.pool()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn live(&self) -> &LiveStepMap {
        &self.live
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.cfg
    }

    async fn begin_uow(&self) -> Result<UnitOfWork> {
        Ok(UnitOfWork::begin(self.db.pool(), self.cfg.uow_timeout).await?)
    }

    // ---- node lifecycle -------------------------------------------------

    /// Pre hook: live step, task row transition, start log, started event
    pub async fn begin_node(&self, task_id: &str, node: NodeId) -> Result<NodeCtx> {
        self.live.set_live_step(task_id, node.as_str());

        let mut uow = self.begin_uow().await?;
        task_repo::set_step_processing(uow.conn()?, task_id, node.as_str()).await?;
        uow.commit().await?;

        self.logger.workflow_start(task_id, node.as_str()).await?;
        self.bus.publish(
            task_id,
            TaskEvent::Status {
                status: TaskStatus::Processing,
                current_step: Some(node.as_str().to_string()),
                roadmap_id: None,
            },
        );
        self.bus.publish(
            task_id,
            TaskEvent::Progress {
                step: node.as_str().to_string(),
                status: ProgressPhase::Started,
                message: format!("{node} started"),
                data: None,
            },
        );

        Ok(NodeCtx {
            task_id: task_id.to_string(),
            node,
            started_at: Utc::now(),
        })
    }

    /// Rebuild a context for a node resuming from suspension, so the
    /// terminal log covers the full span including the pause.
    pub fn resumed_ctx(&self, task_id: &str, node: NodeId, entered_at: DateTime<Utc>) -> NodeCtx {
        self.live.set_live_step(task_id, node.as_str());
        NodeCtx {
            task_id: task_id.to_string(),
            node,
            started_at: entered_at,
        }
    }

    /// Post hook: terminal log and completed event
    pub async fn finish_node(&self, ctx: &NodeCtx, details: serde_json::Value) -> Result<()> {
        let duration_ms = ctx.elapsed_ms();
        self.logger
            .workflow_complete(&ctx.task_id, ctx.node.as_str(), duration_ms, details.clone())
            .await?;
        self.bus.publish(
            &ctx.task_id,
            TaskEvent::Progress {
                step: ctx.node.as_str().to_string(),
                status: ProgressPhase::Completed,
                message: format!("{} completed", ctx.node),
                data: Some(details),
            },
        );
        Ok(())
    }

    /// Error hook: fail the task, log, emit `failed`; the caller re-raises
    pub async fn fail_node(&self, ctx: &NodeCtx, error: &OrchestratorError) -> Result<()> {
        let description = error.to_string();

        let mut uow = self.begin_uow().await?;
        task_repo::mark_failed(uow.conn()?, &ctx.task_id, &description).await?;
        uow.commit().await?;

        self.logger
            .workflow_failed(&ctx.task_id, ctx.node.as_str(), &description, ctx.elapsed_ms())
            .await?;
        self.bus.publish(
            &ctx.task_id,
            TaskEvent::Failed {
                error: description,
            },
        );
        self.live.clear(&ctx.task_id);
        Ok(())
    }

    /// Structured agent log row, the only logging surface runners use
    pub async fn agent_log(
        &self,
        task_id: &str,
        node: NodeId,
        agent_name: &str,
        message: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        self.logger
            .agent(task_id, node.as_str(), agent_name, message, details)
            .await?;
        Ok(())
    }

    // ---- transactional helpers -----------------------------------------

    /// Append a short random suffix until the candidate id is unused.
    /// An id already owned by the same task counts as unique, so node
    /// re-execution after crash recovery keeps its roadmap.
    pub async fn ensure_unique_roadmap_id(&self, task_id: &str, candidate: &str) -> Result<String> {
        let mut id = candidate.to_string();
        loop {
            match roadmap_repo::owner(self.db.pool(), &id).await? {
                None => return Ok(id),
                Some(owner) if owner == task_id => return Ok(id),
                Some(_) => {
                    let suffix: u32 = rand::thread_rng().gen_range(0x1000..0xffff);
                    id = format!("{candidate}-{suffix:x}");
                }
            }
        }
    }

    /// Intent analysis plus roadmap-id link in one transaction
    pub async fn save_intent_analysis(
        &self,
        task_id: &str,
        roadmap_id: &str,
        intent: &IntentAnalysis,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        analysis_repo::upsert_intent(uow.conn()?, task_id, intent).await?;
        task_repo::set_roadmap_id(uow.conn()?, task_id, roadmap_id).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Upsert the framework tree; new concepts start all-pending
    pub async fn save_roadmap_framework(
        &self,
        task_id: &str,
        user_id: &str,
        framework: &RoadmapFramework,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        roadmap_repo::save_framework(uow.conn()?, task_id, user_id, framework).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Persist one validation round
    pub async fn save_validation_result(
        &self,
        task_id: &str,
        result: &ValidationResult,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        analysis_repo::upsert_validation(uow.conn()?, task_id, result).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Edited framework, edit record and modified markers in one
    /// transaction
    pub async fn save_edit(
        &self,
        task_id: &str,
        user_id: &str,
        source: EditSource,
        framework: &RoadmapFramework,
        modified_node_ids: &[String],
        validation_round: u32,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        roadmap_repo::save_framework(uow.conn()?, task_id, user_id, framework).await?;
        analysis_repo::insert_edit_record(
            uow.conn()?,
            task_id,
            source,
            modified_node_ids,
            validation_round,
        )
        .await?;
        roadmap_repo::mark_modified(uow.conn()?, &framework.roadmap_id, modified_node_ids).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Park the task for review; the only place this status is set
    pub async fn update_task_to_pending_review(
        &self,
        task_id: &str,
        roadmap_id: &str,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        task_repo::set_status(uow.conn()?, task_id, TaskStatus::HumanReviewPending).await?;
        uow.commit().await?;

        self.bus.publish(
            task_id,
            TaskEvent::Status {
                status: TaskStatus::HumanReviewPending,
                current_step: Some(NodeId::HumanReview.as_str().to_string()),
                roadmap_id: Some(roadmap_id.to_string()),
            },
        );
        self.bus.publish(
            task_id,
            TaskEvent::HumanReview {
                reason: "human_review_required".to_string(),
            },
        );
        Ok(())
    }

    /// Clear the pending-review status after a decision arrived
    pub async fn update_task_after_review(&self, task_id: &str) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        task_repo::set_status(uow.conn()?, task_id, TaskStatus::Processing).await?;
        uow.commit().await?;
        Ok(())
    }

    // ---- content fan-out helpers ---------------------------------------

    /// A concept took a permit: statuses to generating, start log + event
    pub async fn concept_started(
        &self,
        task_id: &str,
        roadmap_id: &str,
        concept: &Concept,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        roadmap_repo::set_concept_generating(uow.conn()?, roadmap_id, &concept.concept_id).await?;
        uow.commit().await?;

        self.logger
            .concept_start(task_id, &concept.concept_id, &concept.name)
            .await?;
        self.bus.publish(
            task_id,
            TaskEvent::ConceptStart {
                concept_id: concept.concept_id.clone(),
                concept_name: concept.name.clone(),
            },
        );
        Ok(())
    }

    /// One sub-agent finished; record its piece status
    pub async fn set_piece_status(
        &self,
        roadmap_id: &str,
        concept_id: &str,
        kind: ContentKind,
        status: PieceStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        roadmap_repo::set_piece_status(uow.conn()?, roadmap_id, concept_id, kind, status, error)
            .await?;
        uow.commit().await?;
        Ok(())
    }

    /// All three sub-agents returned for a concept: terminal log + event
    pub async fn concept_finished(
        &self,
        task_id: &str,
        concept: &Concept,
        errors: &[String],
        duration_ms: i64,
    ) -> Result<()> {
        if errors.is_empty() {
            self.logger
                .concept_complete(task_id, &concept.concept_id, &concept.name, duration_ms)
                .await?;
            self.bus.publish(
                task_id,
                TaskEvent::ConceptComplete {
                    concept_id: concept.concept_id.clone(),
                    concept_name: concept.name.clone(),
                },
            );
        } else {
            let partial_failure = errors.len() < 3;
            let error = errors.join("; ");
            self.logger
                .concept_failed(task_id, &concept.concept_id, &concept.name, &error, partial_failure)
                .await?;
            self.bus.publish(
                task_id,
                TaskEvent::ConceptFailed {
                    concept_id: concept.concept_id.clone(),
                    error,
                    partial_failure,
                },
            );
        }
        Ok(())
    }

    /// Batch artifact save plus the final task status, in one transaction
    /// with a savepoint per concept so a single bad artifact cannot sink
    /// the whole batch.
    pub async fn save_content_results(
        &self,
        task_id: &str,
        roadmap_id: &str,
        outcome: &ContentOutcome,
    ) -> Result<TaskStatus> {
        let mut uow = self.begin_uow().await?;
        let mut write_failures = 0usize;

        let mut concept_ids: Vec<&str> = outcome
            .tutorials
            .iter()
            .map(|t| t.concept_id.as_str())
            .chain(outcome.resources.iter().map(|r| r.concept_id.as_str()))
            .chain(outcome.quizzes.iter().map(|q| q.concept_id.as_str()))
            .collect();
        concept_ids.sort_unstable();
        concept_ids.dedup();

        for concept_id in concept_ids {
            let mut sp = uow.nested().await?;
            let result = async {
                if let Some(tutorial) =
                    outcome.tutorials.iter().find(|t| t.concept_id == concept_id)
                {
                    content_repo::upsert_tutorial(sp.conn(), roadmap_id, tutorial).await?;
                }
                if let Some(resources) =
                    outcome.resources.iter().find(|r| r.concept_id == concept_id)
                {
                    content_repo::upsert_resources(sp.conn(), roadmap_id, resources).await?;
                }
                if let Some(quiz) = outcome.quizzes.iter().find(|q| q.concept_id == concept_id) {
                    content_repo::upsert_quiz(sp.conn(), roadmap_id, quiz).await?;
                }
                Ok::<(), OrchestratorError>(())
            }
            .await;

            match result {
                Ok(()) => sp.commit().await?,
                Err(err) if err.class().poisons_transaction() => return Err(err),
                Err(err) => {
                    tracing::warn!(task_id, concept_id, %err, "artifact batch savepoint rolled back");
                    sp.rollback().await?;
                    write_failures += 1;
                }
            }
        }

        let status = if outcome.failed.is_empty() && write_failures == 0 {
            TaskStatus::Completed
        } else {
            TaskStatus::PartialFailure
        };
        task_repo::mark_terminal(uow.conn()?, task_id, status).await?;
        uow.commit().await?;
        Ok(status)
    }

    /// Terminal `completed` bus event with statistics
    pub fn publish_completed(
        &self,
        task_id: &str,
        roadmap_id: &str,
        status: TaskStatus,
        statistics: &ContentStatistics,
    ) {
        self.bus.publish(
            task_id,
            TaskEvent::Status {
                status,
                current_step: Some(NodeId::ContentGeneration.as_str().to_string()),
                roadmap_id: Some(roadmap_id.to_string()),
            },
        );
        self.bus.publish(
            task_id,
            TaskEvent::Completed {
                roadmap_id: roadmap_id.to_string(),
                statistics: statistics.clone(),
            },
        );
    }

    // ---- cancellation and retry ----------------------------------------

    /// Terminal cancellation: status, log, notification, topic teardown
    pub async fn mark_task_cancelled(&self, task_id: &str) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        task_repo::mark_terminal(uow.conn()?, task_id, TaskStatus::Cancelled).await?;
        uow.commit().await?;

        self.logger.workflow_cancelled(task_id).await?;
        self.bus.publish(
            task_id,
            TaskEvent::Status {
                status: TaskStatus::Cancelled,
                current_step: None,
                roadmap_id: None,
            },
        );
        self.live.clear(task_id);
        self.bus.close(task_id);
        Ok(())
    }

    /// Next artifact version for a single-piece retry
    pub async fn next_piece_version(
        &self,
        roadmap_id: &str,
        concept_id: &str,
        kind: ContentKind,
    ) -> Result<i64> {
        let current =
            content_repo::current_version(self.db.pool(), kind, roadmap_id, concept_id).await?;
        Ok(current.unwrap_or(0) + 1)
    }

    /// A single-piece retry began: only that piece moves to generating
    pub async fn piece_retry_started(
        &self,
        task_id: &str,
        roadmap_id: &str,
        concept: &Concept,
        kind: ContentKind,
    ) -> Result<()> {
        self.set_piece_status(roadmap_id, &concept.concept_id, kind, PieceStatus::Generating, None)
            .await?;
        self.logger
            .concept_start(task_id, &concept.concept_id, &concept.name)
            .await?;
        self.bus.publish(
            task_id,
            TaskEvent::ConceptStart {
                concept_id: concept.concept_id.clone(),
                concept_name: concept.name.clone(),
            },
        );
        Ok(())
    }

    /// A single-piece retry succeeded: persist the artifact and emit the
    /// concept-scoped events. Task-level status is never touched by
    /// retries, only concept-level status moves.
    pub async fn piece_retry_succeeded(
        &self,
        task_id: &str,
        roadmap_id: &str,
        concept: &Concept,
        artifact: PieceArtifact,
        duration_ms: i64,
    ) -> Result<()> {
        self.save_piece_retry(roadmap_id, &concept.concept_id, artifact).await?;
        self.logger
            .concept_complete(task_id, &concept.concept_id, &concept.name, duration_ms)
            .await?;
        self.bus.publish(
            task_id,
            TaskEvent::ConceptComplete {
                concept_id: concept.concept_id.clone(),
                concept_name: concept.name.clone(),
            },
        );
        Ok(())
    }

    /// A single-piece retry failed: concept-level status only, the task
    /// status never regresses
    pub async fn piece_retry_failed(
        &self,
        task_id: &str,
        roadmap_id: &str,
        concept: &Concept,
        kind: ContentKind,
        error: &str,
    ) -> Result<()> {
        self.set_piece_status(
            roadmap_id,
            &concept.concept_id,
            kind,
            PieceStatus::Failed,
            Some(error),
        )
        .await?;

        let meta = roadmap_repo::concept_metadata(self.db.pool(), roadmap_id, &concept.concept_id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::InvalidState(format!(
                    "no metadata for concept {}",
                    concept.concept_id
                ))
            })?;
        let (content, resources, quiz) = meta.piece_statuses();
        let partial_failure = [content, resources, quiz]
            .iter()
            .any(|status| *status == PieceStatus::Completed);

        self.logger
            .concept_failed(task_id, &concept.concept_id, &concept.name, error, partial_failure)
            .await?;
        self.bus.publish(
            task_id,
            TaskEvent::ConceptFailed {
                concept_id: concept.concept_id.clone(),
                error: error.to_string(),
                partial_failure,
            },
        );
        Ok(())
    }

    /// Persist one retried artifact and mark its piece completed
    pub async fn save_piece_retry(
        &self,
        roadmap_id: &str,
        concept_id: &str,
        artifact: PieceArtifact,
    ) -> Result<()> {
        let mut uow = self.begin_uow().await?;
        let kind = artifact.kind();
        match &artifact {
            PieceArtifact::Tutorial(tutorial) => {
                content_repo::upsert_tutorial(uow.conn()?, roadmap_id, tutorial).await?
            }
            PieceArtifact::Resources(resources) => {
                content_repo::upsert_resources(uow.conn()?, roadmap_id, resources).await?
            }
            PieceArtifact::Quiz(quiz) => {
                content_repo::upsert_quiz(uow.conn()?, roadmap_id, quiz).await?
            }
        }
        roadmap_repo::set_piece_status(
            uow.conn()?,
            roadmap_id,
            concept_id,
            kind,
            PieceStatus::Completed,
            None,
        )
        .await?;
        uow.commit().await?;
        Ok(())
    }

    /// Whether any piece of any concept in the roadmap is still failed;
    /// exposed for status displays after retries.
    pub async fn has_failed_pieces(&self, roadmap_id: &str) -> Result<bool> {
        Ok(roadmap_repo::failed_piece_count(self.db.pool(), roadmap_id).await? > 0)
    }
}

/// One artifact produced by a piece retry
pub enum PieceArtifact {
    Tutorial(crate::model::Tutorial),
    Resources(crate::model::ResourceSet),
    Quiz(crate::model::Quiz),
}

impl PieceArtifact {
    pub fn kind(&self) -> ContentKind {
        match self {
            PieceArtifact::Tutorial(_) => ContentKind::Tutorial,
            PieceArtifact::Resources(_) => ContentKind::Resources,
            PieceArtifact::Quiz(_) => ContentKind::Quiz,
        }
    }
}
