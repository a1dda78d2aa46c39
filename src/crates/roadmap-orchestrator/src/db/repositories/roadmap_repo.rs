//! Roadmap tree repository
//!
//! The structural tree is replaced wholesale when a framework is saved
//! (curriculum design and edits both go through [`save_framework`]), while
//! `concept_metadata` is preserved for concepts that survive the edit so
//! generation statuses are not lost.

use crate::db::error::DbResult;
use crate::db::models::{ConceptMetadataRow, ConceptRow, ModuleRow, RoadmapRow, StageRow};
use crate::model::{ContentKind, OverallStatus, PieceStatus, RoadmapFramework};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Whether a roadmap id is already taken
pub async fn exists<'e, E>(ex: E, roadmap_id: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM roadmaps WHERE roadmap_id = ?")
        .bind(roadmap_id)
        .fetch_optional(ex)
        .await?;
    Ok(row.is_some())
}

/// Task owning a roadmap id, if the id is taken
pub async fn owner<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(String,)> =
        sqlx::query_as("SELECT task_id FROM roadmaps WHERE roadmap_id = ?")
            .bind(roadmap_id)
            .fetch_optional(ex)
            .await?;
    Ok(row.map(|(task_id,)| task_id))
}

/// Get the roadmap header row
pub async fn get<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Option<RoadmapRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, RoadmapRow>("SELECT * FROM roadmaps WHERE roadmap_id = ?")
        .bind(roadmap_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// Upsert the header and replace the structural tree for a framework
///
/// Metadata rows are created pending for new concepts, kept as-is for
/// surviving concepts, and dropped for concepts the edit removed.
pub async fn save_framework(
    conn: &mut SqliteConnection,
    task_id: &str,
    user_id: &str,
    framework: &RoadmapFramework,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    let roadmap_id = &framework.roadmap_id;

    sqlx::query(
        "INSERT INTO roadmaps
             (roadmap_id, task_id, user_id, title, total_concepts, total_hours,
              recommended_completion_weeks, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (roadmap_id) DO UPDATE SET
             title = excluded.title,
             total_concepts = excluded.total_concepts,
             total_hours = excluded.total_hours,
             recommended_completion_weeks = excluded.recommended_completion_weeks,
             updated_at = excluded.updated_at",
    )
    .bind(roadmap_id)
    .bind(task_id)
    .bind(user_id)
    .bind(&framework.title)
    .bind(framework.concept_count() as i64)
    .bind(framework.total_hours)
    .bind(framework.recommended_completion_weeks as i64)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    for table in ["stages", "modules", "concepts"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE roadmap_id = ?"))
            .bind(roadmap_id)
            .execute(&mut *conn)
            .await?;
    }

    for (stage_pos, stage) in framework.stages.iter().enumerate() {
        sqlx::query(
            "INSERT INTO stages (roadmap_id, stage_id, position, name, description, estimated_hours)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(roadmap_id)
        .bind(&stage.stage_id)
        .bind(stage_pos as i64)
        .bind(&stage.name)
        .bind(&stage.description)
        .bind(stage.estimated_hours)
        .execute(&mut *conn)
        .await?;

        for (module_pos, module) in stage.modules.iter().enumerate() {
            sqlx::query(
                "INSERT INTO modules
                     (roadmap_id, module_id, stage_id, position, name, description, learning_objectives)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(roadmap_id)
            .bind(&module.module_id)
            .bind(&stage.stage_id)
            .bind(module_pos as i64)
            .bind(&module.name)
            .bind(&module.description)
            .bind(serde_json::to_string(&module.learning_objectives).unwrap_or_default())
            .execute(&mut *conn)
            .await?;

            for (concept_pos, concept) in module.concepts.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO concepts
                         (roadmap_id, concept_id, module_id, position, name, description, difficulty, keywords)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(roadmap_id)
                .bind(&concept.concept_id)
                .bind(&module.module_id)
                .bind(concept_pos as i64)
                .bind(&concept.name)
                .bind(&concept.description)
                .bind(&concept.difficulty)
                .bind(serde_json::to_string(&concept.keywords).unwrap_or_default())
                .execute(&mut *conn)
                .await?;

                sqlx::query(
                    "INSERT INTO concept_metadata (roadmap_id, concept_id, updated_at)
                     VALUES (?, ?, ?)
                     ON CONFLICT (roadmap_id, concept_id) DO NOTHING",
                )
                .bind(roadmap_id)
                .bind(&concept.concept_id)
                .bind(&now)
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    // Drop metadata for concepts the edit removed.
    sqlx::query(
        "DELETE FROM concept_metadata
         WHERE roadmap_id = ?
           AND concept_id NOT IN (SELECT concept_id FROM concepts WHERE roadmap_id = ?)",
    )
    .bind(roadmap_id)
    .bind(roadmap_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flag the concepts an edit touched
pub async fn mark_modified(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    node_ids: &[String],
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    for node_id in node_ids {
        sqlx::query(
            "UPDATE concept_metadata SET modified = 1, updated_at = ?
             WHERE roadmap_id = ? AND concept_id = ?",
        )
        .bind(&now)
        .bind(roadmap_id)
        .bind(node_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn stages<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Vec<StageRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, StageRow>(
        "SELECT * FROM stages WHERE roadmap_id = ? ORDER BY position",
    )
    .bind(roadmap_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn modules<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Vec<ModuleRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ModuleRow>(
        "SELECT * FROM modules WHERE roadmap_id = ? ORDER BY position",
    )
    .bind(roadmap_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn concepts<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Vec<ConceptRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ConceptRow>(
        "SELECT * FROM concepts WHERE roadmap_id = ? ORDER BY position",
    )
    .bind(roadmap_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn concept<'e, E>(
    ex: E,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<Option<ConceptRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ConceptRow>(
        "SELECT * FROM concepts WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn metadata<'e, E>(ex: E, roadmap_id: &str) -> DbResult<Vec<ConceptMetadataRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ConceptMetadataRow>(
        "SELECT * FROM concept_metadata WHERE roadmap_id = ? ORDER BY concept_id",
    )
    .bind(roadmap_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn concept_metadata<'e, E>(
    ex: E,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<Option<ConceptMetadataRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ConceptMetadataRow>(
        "SELECT * FROM concept_metadata WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

/// Move all three piece statuses to `generating`
pub async fn set_concept_generating(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE concept_metadata
         SET content_status = 'generating', resources_status = 'generating',
             quiz_status = 'generating', overall_status = 'generating', updated_at = ?
         WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(&now)
    .bind(roadmap_id)
    .bind(concept_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Update one piece status and recompute the derived overall status
pub async fn set_piece_status(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    concept_id: &str,
    kind: ContentKind,
    status: PieceStatus,
    error: Option<&str>,
) -> DbResult<()> {
    let row = sqlx::query_as::<_, ConceptMetadataRow>(
        "SELECT * FROM concept_metadata WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_one(&mut *conn)
    .await?;

    let (mut content, mut resources, mut quiz) = row.piece_statuses();
    match kind {
        ContentKind::Tutorial => content = status,
        ContentKind::Resources => resources = status,
        ContentKind::Quiz => quiz = status,
    }
    let overall = OverallStatus::derive(content, resources, quiz);

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE concept_metadata
         SET content_status = ?, resources_status = ?, quiz_status = ?,
             overall_status = ?, last_error = ?, updated_at = ?
         WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(content.as_str())
    .bind(resources.as_str())
    .bind(quiz.as_str())
    .bind(overall.as_str())
    .bind(error)
    .bind(&now)
    .bind(roadmap_id)
    .bind(concept_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Count concepts whose overall status carries at least one failure
pub async fn failed_piece_count<'e, E>(ex: E, roadmap_id: &str) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM concept_metadata
         WHERE roadmap_id = ?
           AND (content_status = 'failed' OR resources_status = 'failed' OR quiz_status = 'failed')",
    )
    .bind(roadmap_id)
    .fetch_one(ex)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::task_repo;
    use crate::db::DatabaseConnection;
    use crate::model::{Concept, Module, Stage};

    fn framework(roadmap_id: &str, concept_ids: &[&str]) -> RoadmapFramework {
        RoadmapFramework {
            roadmap_id: roadmap_id.to_string(),
            title: "Learn Go".to_string(),
            stages: vec![Stage {
                stage_id: "s1".to_string(),
                name: "Foundations".to_string(),
                description: String::new(),
                modules: vec![Module {
                    module_id: "m1".to_string(),
                    name: "Basics".to_string(),
                    description: String::new(),
                    learning_objectives: vec!["write programs".to_string()],
                    concepts: concept_ids
                        .iter()
                        .map(|id| Concept {
                            concept_id: id.to_string(),
                            name: format!("Concept {id}"),
                            description: String::new(),
                            difficulty: "beginner".to_string(),
                            keywords: vec![],
                        })
                        .collect(),
                }],
                estimated_hours: 6.0,
            }],
            total_concepts: concept_ids.len() as u32,
            total_hours: 6.0,
            recommended_completion_weeks: 2,
        }
    }

    async fn db_with_task() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        task_repo::create(db.pool(), "task-1", "u1", "Learn Go")
            .await
            .unwrap();
        db
    }

    async fn save(db: &DatabaseConnection, fw: &RoadmapFramework) {
        let mut tx = db.pool().begin().await.unwrap();
        save_framework(&mut tx, "task-1", "u1", fw).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_and_read_tree() {
        let db = db_with_task().await;
        save(&db, &framework("rm-1", &["c1", "c2"])).await;

        assert!(exists(db.pool(), "rm-1").await.unwrap());
        assert_eq!(stages(db.pool(), "rm-1").await.unwrap().len(), 1);
        assert_eq!(concepts(db.pool(), "rm-1").await.unwrap().len(), 2);

        let meta = metadata(db.pool(), "rm-1").await.unwrap();
        assert_eq!(meta.len(), 2);
        assert!(meta.iter().all(|m| m.overall_status == "pending"));
    }

    #[tokio::test]
    async fn test_edit_preserves_surviving_statuses() {
        let db = db_with_task().await;
        save(&db, &framework("rm-1", &["c1", "c2"])).await;

        {
            let mut tx = db.pool().begin().await.unwrap();
            set_piece_status(
                &mut tx,
                "rm-1",
                "c1",
                ContentKind::Tutorial,
                PieceStatus::Completed,
                None,
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        // Edit drops c2 and introduces c3.
        save(&db, &framework("rm-1", &["c1", "c3"])).await;

        let meta = metadata(db.pool(), "rm-1").await.unwrap();
        let ids: Vec<_> = meta.iter().map(|m| m.concept_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let c1 = meta.iter().find(|m| m.concept_id == "c1").unwrap();
        assert_eq!(c1.content_status, "completed");
    }

    #[tokio::test]
    async fn test_piece_status_derives_overall() {
        let db = db_with_task().await;
        save(&db, &framework("rm-1", &["c1"])).await;

        let mut tx = db.pool().begin().await.unwrap();
        set_piece_status(&mut tx, "rm-1", "c1", ContentKind::Tutorial, PieceStatus::Completed, None)
            .await
            .unwrap();
        set_piece_status(&mut tx, "rm-1", "c1", ContentKind::Resources, PieceStatus::Completed, None)
            .await
            .unwrap();
        set_piece_status(
            &mut tx,
            "rm-1",
            "c1",
            ContentKind::Quiz,
            PieceStatus::Failed,
            Some("quiz agent failed"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let meta = concept_metadata(db.pool(), "rm-1", "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.overall_status, "partial_failed");
        assert_eq!(meta.last_error.as_deref(), Some("quiz agent failed"));
        assert_eq!(failed_piece_count(db.pool(), "rm-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_modified() {
        let db = db_with_task().await;
        save(&db, &framework("rm-1", &["c1", "c2"])).await;

        let mut tx = db.pool().begin().await.unwrap();
        mark_modified(&mut tx, "rm-1", &["c2".to_string()]).await.unwrap();
        tx.commit().await.unwrap();

        let meta = concept_metadata(db.pool(), "rm-1", "c2").await.unwrap().unwrap();
        assert_eq!(meta.modified, 1);
    }
}
