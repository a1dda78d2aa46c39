//! Roadmap endpoint handlers

use crate::api::error::{ApiError, ApiResult};
use crate::api::{response, routes::AppState};
use crate::db::repositories::roadmap_repo;
use crate::model::{ContentKind, GenerationRequest};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// POST /api/v1/roadmaps
pub async fn submit_roadmap(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let (task_id, roadmap_id) = state.executor.submit(request).await?;
    tracing::info!(%task_id, %roadmap_id, "generation task submitted");
    Ok(response::created(json!({
        "task_id": task_id,
        "roadmap_id": roadmap_id,
    })))
}

#[derive(Debug, Serialize)]
pub struct ConceptView {
    pub concept_id: String,
    pub name: String,
    pub description: String,
    pub difficulty: String,
    pub keywords: Vec<String>,
    pub content_status: String,
    pub resources_status: String,
    pub quiz_status: String,
    pub overall_status: String,
    pub modified: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleView {
    pub module_id: String,
    pub name: String,
    pub description: String,
    pub learning_objectives: Vec<String>,
    pub concepts: Vec<ConceptView>,
}

#[derive(Debug, Serialize)]
pub struct StageView {
    pub stage_id: String,
    pub name: String,
    pub description: String,
    pub estimated_hours: f64,
    pub modules: Vec<ModuleView>,
}

#[derive(Debug, Serialize)]
pub struct RoadmapView {
    pub roadmap_id: String,
    pub task_id: String,
    pub title: String,
    pub total_concepts: i64,
    pub total_hours: f64,
    pub recommended_completion_weeks: i64,
    pub stages: Vec<StageView>,
}

/// GET /api/v1/roadmaps/:roadmap_id
///
/// The full tree with per-concept generation statuses; readable on
/// `partial_failure` so clients can see which artifacts are missing.
pub async fn get_roadmap(
    State(state): State<AppState>,
    Path(roadmap_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let pool = state.db.pool();
    let roadmap = roadmap_repo::get(pool, &roadmap_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Roadmap not found: {roadmap_id}")))?;

    let stages = roadmap_repo::stages(pool, &roadmap_id).await?;
    let modules = roadmap_repo::modules(pool, &roadmap_id).await?;
    let concepts = roadmap_repo::concepts(pool, &roadmap_id).await?;
    let metadata: HashMap<String, _> = roadmap_repo::metadata(pool, &roadmap_id)
        .await?
        .into_iter()
        .map(|row| (row.concept_id.clone(), row))
        .collect();

    let mut concept_views: HashMap<String, Vec<ConceptView>> = HashMap::new();
    {
        for concept in concepts {
            let meta = metadata.get(&concept.concept_id);
            concept_views
                .entry(concept.module_id.clone())
                .or_default()
                .push(ConceptView {
                    keywords: serde_json::from_str(&concept.keywords).unwrap_or_default(),
                    concept_id: concept.concept_id,
                    name: concept.name,
                    description: concept.description,
                    difficulty: concept.difficulty,
                    content_status: meta
                        .map(|m| m.content_status.clone())
                        .unwrap_or_else(|| "pending".to_string()),
                    resources_status: meta
                        .map(|m| m.resources_status.clone())
                        .unwrap_or_else(|| "pending".to_string()),
                    quiz_status: meta
                        .map(|m| m.quiz_status.clone())
                        .unwrap_or_else(|| "pending".to_string()),
                    overall_status: meta
                        .map(|m| m.overall_status.clone())
                        .unwrap_or_else(|| "pending".to_string()),
                    modified: meta.map(|m| m.modified != 0).unwrap_or(false),
                });
        }
    }

    let mut module_views: HashMap<String, Vec<ModuleView>> = HashMap::new();
    for module in modules {
        module_views
            .entry(module.stage_id.clone())
            .or_default()
            .push(ModuleView {
                learning_objectives: serde_json::from_str(&module.learning_objectives)
                    .unwrap_or_default(),
                concepts: concept_views.remove(&module.module_id).unwrap_or_default(),
                module_id: module.module_id,
                name: module.name,
                description: module.description,
            });
    }

    let stage_views = stages
        .into_iter()
        .map(|stage| StageView {
            modules: module_views.remove(&stage.stage_id).unwrap_or_default(),
            stage_id: stage.stage_id,
            name: stage.name,
            description: stage.description,
            estimated_hours: stage.estimated_hours,
        })
        .collect();

    Ok(response::ok(RoadmapView {
        roadmap_id: roadmap.roadmap_id,
        task_id: roadmap.task_id,
        title: roadmap.title,
        total_concepts: roadmap.total_concepts,
        total_hours: roadmap.total_hours,
        recommended_completion_weeks: roadmap.recommended_completion_weeks,
        stages: stage_views,
    }))
}

/// POST /api/v1/roadmaps/:roadmap_id/concepts/:concept_id/:kind/retry
pub async fn retry_content(
    State(state): State<AppState>,
    Path((roadmap_id, concept_id, kind)): Path<(String, String, String)>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let kind = ContentKind::parse(&kind).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "content kind must be tutorial, resources or quiz, got {kind:?}"
        ))
    })?;

    state
        .executor
        .retry_content(&roadmap_id, &concept_id, kind)
        .await?;
    tracing::info!(%roadmap_id, %concept_id, kind = kind.as_str(), "content retry scheduled");
    Ok(response::accepted(json!({
        "roadmap_id": roadmap_id,
        "concept_id": concept_id,
        "kind": kind.as_str(),
    })))
}
