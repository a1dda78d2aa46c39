//! Content artifact repository
//!
//! Upserts are keyed by (roadmap_id, concept_id) so re-running a node or
//! retrying a piece replaces the artifact instead of duplicating it.

use crate::db::error::DbResult;
use crate::db::models::{QuizRow, ResourceRow, TutorialRow};
use crate::model::{ContentKind, Quiz, ResourceSet, Tutorial};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection};

pub async fn upsert_tutorial(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    tutorial: &Tutorial,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO tutorials (roadmap_id, concept_id, markdown, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (roadmap_id, concept_id) DO UPDATE SET
             markdown = excluded.markdown,
             version = excluded.version,
             updated_at = excluded.updated_at",
    )
    .bind(roadmap_id)
    .bind(&tutorial.concept_id)
    .bind(&tutorial.markdown)
    .bind(tutorial.version)
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_resources(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    resources: &ResourceSet,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO resources (roadmap_id, concept_id, items, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (roadmap_id, concept_id) DO UPDATE SET
             items = excluded.items,
             version = excluded.version,
             updated_at = excluded.updated_at",
    )
    .bind(roadmap_id)
    .bind(&resources.concept_id)
    .bind(serde_json::to_string(&resources.items).unwrap_or_default())
    .bind(resources.version)
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_quiz(
    conn: &mut SqliteConnection,
    roadmap_id: &str,
    quiz: &Quiz,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO quizzes (roadmap_id, concept_id, questions, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (roadmap_id, concept_id) DO UPDATE SET
             questions = excluded.questions,
             version = excluded.version,
             updated_at = excluded.updated_at",
    )
    .bind(roadmap_id)
    .bind(&quiz.concept_id)
    .bind(serde_json::to_string(&quiz.questions).unwrap_or_default())
    .bind(quiz.version)
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn tutorial<'e, E>(
    ex: E,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<Option<TutorialRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TutorialRow>(
        "SELECT * FROM tutorials WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn resources<'e, E>(
    ex: E,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<Option<ResourceRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ResourceRow>(
        "SELECT * FROM resources WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn quiz<'e, E>(ex: E, roadmap_id: &str, concept_id: &str) -> DbResult<Option<QuizRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, QuizRow>(
        "SELECT * FROM quizzes WHERE roadmap_id = ? AND concept_id = ?",
    )
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

/// Current artifact version for one piece, if it exists
pub async fn current_version<'e, E>(
    ex: E,
    kind: ContentKind,
    roadmap_id: &str,
    concept_id: &str,
) -> DbResult<Option<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let table = match kind {
        ContentKind::Tutorial => "tutorials",
        ContentKind::Resources => "resources",
        ContentKind::Quiz => "quizzes",
    };
    let row: Option<(i64,)> = sqlx::query_as(&format!(
        "SELECT version FROM {table} WHERE roadmap_id = ? AND concept_id = ?"
    ))
    .bind(roadmap_id)
    .bind(concept_id)
    .fetch_optional(ex)
    .await?;
    Ok(row.map(|(version,)| version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{roadmap_repo, task_repo};
    use crate::db::DatabaseConnection;
    use crate::model::{Concept, Module, RoadmapFramework, Stage};

    async fn db_with_roadmap() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        task_repo::create(db.pool(), "task-1", "u1", "t").await.unwrap();

        let fw = RoadmapFramework {
            roadmap_id: "rm-1".to_string(),
            title: "t".to_string(),
            stages: vec![Stage {
                stage_id: "s1".to_string(),
                name: "s".to_string(),
                description: String::new(),
                modules: vec![Module {
                    module_id: "m1".to_string(),
                    name: "m".to_string(),
                    description: String::new(),
                    learning_objectives: vec![],
                    concepts: vec![Concept {
                        concept_id: "c1".to_string(),
                        name: "c".to_string(),
                        description: String::new(),
                        difficulty: "beginner".to_string(),
                        keywords: vec![],
                    }],
                }],
                estimated_hours: 1.0,
            }],
            total_concepts: 1,
            total_hours: 1.0,
            recommended_completion_weeks: 1,
        };
        let mut tx = db.pool().begin().await.unwrap();
        roadmap_repo::save_framework(&mut tx, "task-1", "u1", &fw)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_tutorial_upsert_replaces() {
        let db = db_with_roadmap().await;

        for version in 1..=2 {
            let mut tx = db.pool().begin().await.unwrap();
            upsert_tutorial(
                &mut tx,
                "rm-1",
                &Tutorial {
                    concept_id: "c1".to_string(),
                    markdown: format!("# v{version}"),
                    version,
                },
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        let row = tutorial(db.pool(), "rm-1", "c1").await.unwrap().unwrap();
        assert_eq!(row.version, 2);
        assert_eq!(row.markdown, "# v2");
        assert_eq!(
            current_version(db.pool(), ContentKind::Tutorial, "rm-1", "c1")
                .await
                .unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_is_none() {
        let db = db_with_roadmap().await;
        assert!(quiz(db.pool(), "rm-1", "c1").await.unwrap().is_none());
        assert_eq!(
            current_version(db.pool(), ContentKind::Quiz, "rm-1", "c1")
                .await
                .unwrap(),
            None
        );
    }
}
