//! Content generation runner (R6) and fan-out engine
//!
//! Flattens the roadmap into concepts, schedules each under a bounded
//! semaphore, and runs the three sub-agents (tutorial, resources, quiz)
//! in parallel per concept. Sub-agent failures never abort the node: they
//! are absorbed into per-concept bookkeeping and roll up into the task's
//! terminal status.
//!
//! Ordering: events for one concept follow start then terminal; across
//! concepts nothing is ordered. With permits = `CONTENT_CONCURRENCY`, at
//! most that many concepts are generating at any instant.
//!
//! Cancellation is cooperative: once the flag is set no new concept takes
//! a permit, in-flight sub-agent calls run to completion, and all their
//! results are discarded.

use crate::agents::AgentSet;
use crate::brain::{PieceArtifact, WorkflowBrain};
use crate::error::{OrchestratorError, Result};
use crate::executor::graph::WorkflowState;
use crate::executor::retry::RetryPolicy;
use crate::model::{Concept, ContentKind, ContentOutcome, FailedPiece, PieceStatus};
use crate::runners::NodeOutput;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

struct ConceptResult {
    concept: Concept,
    tutorial: Option<crate::model::Tutorial>,
    resources: Option<crate::model::ResourceSet>,
    quiz: Option<crate::model::Quiz>,
    errors: Vec<(ContentKind, String)>,
    cancelled: bool,
}

pub async fn run(
    brain: Arc<WorkflowBrain>,
    agents: Arc<AgentSet>,
    state: &mut WorkflowState,
    cancel: watch::Receiver<bool>,
) -> Result<NodeOutput> {
    let framework = state.framework()?.clone();
    let concepts: Vec<Concept> = framework.flatten_concepts().into_iter().cloned().collect();
    let semaphore = Arc::new(Semaphore::new(brain.config().content_concurrency));
    let mut join_set = JoinSet::new();

    for concept in concepts {
        let brain = brain.clone();
        let agents = agents.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();
        let task_id = state.task_id.clone();
        let roadmap_id = state.roadmap_id.clone();
        let title = framework.title.clone();
        join_set.spawn(async move {
            generate_concept(brain, agents, semaphore, cancel, task_id, roadmap_id, title, concept)
                .await
        });
    }

    let mut results = Vec::new();
    let mut cancelled = *cancel.borrow();
    while let Some(joined) = join_set.join_next().await {
        let result = joined
            .map_err(|err| OrchestratorError::System(format!("content worker died: {err}")))??;
        cancelled = cancelled || result.cancelled || *cancel.borrow();
        results.push(result);
    }
    if cancelled {
        // In-flight results are discarded; the cancel path already wrote
        // the terminal status and closed the topic.
        return Err(OrchestratorError::Cancelled);
    }

    let mut outcome = ContentOutcome::default();
    outcome.statistics.total_concepts = results.len();
    for result in results {
        match result.errors.len() {
            0 => outcome.statistics.completed_concepts += 1,
            3 => outcome.statistics.failed_concepts += 1,
            _ => outcome.statistics.partial_concepts += 1,
        }
        outcome.tutorials.extend(result.tutorial);
        outcome.resources.extend(result.resources);
        outcome.quizzes.extend(result.quiz);
        let concept_id = result.concept.concept_id;
        outcome.failed.extend(result.errors.into_iter().map(|(kind, error)| FailedPiece {
            concept_id: concept_id.clone(),
            kind,
            error,
        }));
    }

    let status = brain
        .save_content_results(&state.task_id, &state.roadmap_id, &outcome)
        .await?;
    brain.publish_completed(&state.task_id, &state.roadmap_id, status, &outcome.statistics);
    state.content_statistics = Some(outcome.statistics.clone());

    Ok(NodeOutput::Terminal {
        status,
        details: json!({
            "total_concepts": outcome.statistics.total_concepts,
            "completed_concepts": outcome.statistics.completed_concepts,
            "partial_concepts": outcome.statistics.partial_concepts,
            "failed_concepts": outcome.statistics.failed_concepts,
        }),
    })
}

#[allow(clippy::too_many_arguments)]
async fn generate_concept(
    brain: Arc<WorkflowBrain>,
    agents: Arc<AgentSet>,
    semaphore: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
    task_id: String,
    roadmap_id: String,
    roadmap_title: String,
    concept: Concept,
) -> Result<ConceptResult> {
    let cancelled_result = |concept: Concept| ConceptResult {
        concept,
        tutorial: None,
        resources: None,
        quiz: None,
        errors: Vec::new(),
        cancelled: true,
    };

    let Ok(_permit) = semaphore.acquire_owned().await else {
        return Ok(cancelled_result(concept));
    };
    if *cancel.borrow() {
        return Ok(cancelled_result(concept));
    }

    brain.concept_started(&task_id, &roadmap_id, &concept).await?;
    let started = Instant::now();
    let policy = RetryPolicy::default();

    let tutorial_call = || {
        let agents = agents.clone();
        let concept = concept.clone();
        let title = roadmap_title.clone();
        async move { agents.tutorial.write_tutorial(&concept, &title).await }
    };
    let resources_call = || {
        let agents = agents.clone();
        let concept = concept.clone();
        async move { agents.resources.curate(&concept).await }
    };
    let quiz_call = || {
        let agents = agents.clone();
        let concept = concept.clone();
        async move { agents.quiz.write_quiz(&concept).await }
    };

    let (tutorial, resources, quiz) = tokio::join!(
        run_piece(&brain, &policy, &roadmap_id, &concept.concept_id, ContentKind::Tutorial, tutorial_call),
        run_piece(&brain, &policy, &roadmap_id, &concept.concept_id, ContentKind::Resources, resources_call),
        run_piece(&brain, &policy, &roadmap_id, &concept.concept_id, ContentKind::Quiz, quiz_call),
    );

    let mut result = ConceptResult {
        concept,
        tutorial: None,
        resources: None,
        quiz: None,
        errors: Vec::new(),
        cancelled: false,
    };
    match tutorial? {
        Ok(artifact) => result.tutorial = Some(artifact),
        Err(error) => result.errors.push((ContentKind::Tutorial, error)),
    }
    match resources? {
        Ok(artifact) => result.resources = Some(artifact),
        Err(error) => result.errors.push((ContentKind::Resources, error)),
    }
    match quiz? {
        Ok(artifact) => result.quiz = Some(artifact),
        Err(error) => result.errors.push((ContentKind::Quiz, error)),
    }

    if *cancel.borrow() {
        result.cancelled = true;
        return Ok(result);
    }

    brain
        .concept_finished(
            &task_id,
            &result.concept,
            &result
                .errors
                .iter()
                .map(|(kind, error)| format!("{}: {error}", kind.as_str()))
                .collect::<Vec<_>>(),
            started.elapsed().as_millis() as i64,
        )
        .await?;

    Ok(result)
}

/// Run one sub-agent with in-node retries; the inner result is the
/// absorbed per-piece outcome, the outer one is infrastructure failure.
async fn run_piece<F, Fut, T>(
    brain: &WorkflowBrain,
    policy: &RetryPolicy,
    roadmap_id: &str,
    concept_id: &str,
    kind: ContentKind,
    call: F,
) -> Result<std::result::Result<T, String>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = crate::agents::AgentResult<T>>,
{
    let mut retries = 0usize;
    loop {
        match call().await {
            Ok(artifact) => {
                brain
                    .set_piece_status(roadmap_id, concept_id, kind, PieceStatus::Completed, None)
                    .await?;
                return Ok(Ok(artifact));
            }
            Err(err) if err.class().is_retryable() && policy.allows(retries, false) => {
                tracing::debug!(concept_id, kind = kind.as_str(), %err, "retrying sub-agent");
                tokio::time::sleep(policy.delay(retries)).await;
                retries += 1;
            }
            Err(err) => {
                let error = err.to_string();
                brain
                    .set_piece_status(
                        roadmap_id,
                        concept_id,
                        kind,
                        PieceStatus::Failed,
                        Some(&error),
                    )
                    .await?;
                return Ok(Err(error));
            }
        }
    }
}

/// Out-of-band retry of exactly one artifact for one concept
///
/// Emits the same concept-scoped events as the fan-out. Only the retried
/// piece's status moves; task-level status is terminal by now and stays
/// untouched either way.
pub async fn retry_piece(
    brain: Arc<WorkflowBrain>,
    agents: Arc<AgentSet>,
    task_id: String,
    roadmap_id: String,
    roadmap_title: String,
    concept: Concept,
    kind: ContentKind,
) -> Result<()> {
    let version = brain
        .next_piece_version(&roadmap_id, &concept.concept_id, kind)
        .await?;
    brain
        .piece_retry_started(&task_id, &roadmap_id, &concept, kind)
        .await?;

    let started = Instant::now();
    let policy = RetryPolicy::default();
    let mut retries = 0usize;

    let outcome = loop {
        let attempt = match kind {
            ContentKind::Tutorial => agents
                .tutorial
                .write_tutorial(&concept, &roadmap_title)
                .await
                .map(|mut tutorial| {
                    tutorial.version = version;
                    PieceArtifact::Tutorial(tutorial)
                }),
            ContentKind::Resources => agents.resources.curate(&concept).await.map(|mut set| {
                set.version = version;
                PieceArtifact::Resources(set)
            }),
            ContentKind::Quiz => agents.quiz.write_quiz(&concept).await.map(|mut quiz| {
                quiz.version = version;
                PieceArtifact::Quiz(quiz)
            }),
        };

        match attempt {
            Ok(artifact) => break Ok(artifact),
            Err(err) if err.class().is_retryable() && policy.allows(retries, false) => {
                tokio::time::sleep(policy.delay(retries)).await;
                retries += 1;
            }
            Err(err) => break Err(err),
        }
    };

    match outcome {
        Ok(artifact) => {
            brain
                .piece_retry_succeeded(
                    &task_id,
                    &roadmap_id,
                    &concept,
                    artifact,
                    started.elapsed().as_millis() as i64,
                )
                .await
        }
        Err(err) => {
            brain
                .piece_retry_failed(&task_id, &roadmap_id, &concept, kind, &err.to_string())
                .await
        }
    }
}
