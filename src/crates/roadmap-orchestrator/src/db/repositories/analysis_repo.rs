//! Intent, validation and edit-record repository

use crate::db::error::DbResult;
use crate::db::models::{EditRecordRow, IntentAnalysisRow, ValidationResultRow};
use crate::model::{EditSource, IntentAnalysis, ValidationResult};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Persist the intent analysis; idempotent per task
pub async fn upsert_intent(
    conn: &mut SqliteConnection,
    task_id: &str,
    intent: &IntentAnalysis,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO intent_analyses
             (task_id, parsed_goal, key_technologies, difficulty_profile,
              time_constraint, skill_gap_analysis, personalized_suggestions, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (task_id) DO UPDATE SET
             parsed_goal = excluded.parsed_goal,
             key_technologies = excluded.key_technologies,
             difficulty_profile = excluded.difficulty_profile,
             time_constraint = excluded.time_constraint,
             skill_gap_analysis = excluded.skill_gap_analysis,
             personalized_suggestions = excluded.personalized_suggestions",
    )
    .bind(task_id)
    .bind(&intent.parsed_goal)
    .bind(serde_json::to_string(&intent.key_technologies).unwrap_or_default())
    .bind(&intent.difficulty_profile)
    .bind(&intent.time_constraint)
    .bind(serde_json::to_string(&intent.skill_gap_analysis).unwrap_or_default())
    .bind(serde_json::to_string(&intent.personalized_suggestions).unwrap_or_default())
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn intent<'e, E>(ex: E, task_id: &str) -> DbResult<Option<IntentAnalysisRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, IntentAnalysisRow>(
        "SELECT * FROM intent_analyses WHERE task_id = ?",
    )
    .bind(task_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

/// Persist one validation round; idempotent per (task, round)
pub async fn upsert_validation(
    conn: &mut SqliteConnection,
    task_id: &str,
    result: &ValidationResult,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO validation_results
             (task_id, validation_round, overall_score, is_valid, dimension_scores,
              issues, improvement_suggestions, validation_summary, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (task_id, validation_round) DO UPDATE SET
             overall_score = excluded.overall_score,
             is_valid = excluded.is_valid,
             dimension_scores = excluded.dimension_scores,
             issues = excluded.issues,
             improvement_suggestions = excluded.improvement_suggestions,
             validation_summary = excluded.validation_summary",
    )
    .bind(task_id)
    .bind(result.validation_round as i64)
    .bind(result.overall_score)
    .bind(result.is_valid as i64)
    .bind(serde_json::to_string(&result.dimension_scores).unwrap_or_default())
    .bind(serde_json::to_string(&result.issues).unwrap_or_default())
    .bind(serde_json::to_string(&result.improvement_suggestions).unwrap_or_default())
    .bind(&result.validation_summary)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn validations<'e, E>(ex: E, task_id: &str) -> DbResult<Vec<ValidationResultRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ValidationResultRow>(
        "SELECT * FROM validation_results WHERE task_id = ? ORDER BY validation_round",
    )
    .bind(task_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

/// Record one edit; replays of the same node are absorbed by the
/// (task, source, round) uniqueness constraint.
pub async fn insert_edit_record(
    conn: &mut SqliteConnection,
    task_id: &str,
    source: EditSource,
    modified_node_ids: &[String],
    validation_round: u32,
) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO edit_records
             (task_id, edit_source, modified_node_ids, validation_round, round_policy, created_at)
         VALUES (?, ?, ?, ?, 'continue', ?)
         ON CONFLICT (task_id, edit_source, validation_round) DO NOTHING",
    )
    .bind(task_id)
    .bind(source.as_str())
    .bind(serde_json::to_string(modified_node_ids).unwrap_or_default())
    .bind(validation_round as i64)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn edit_records<'e, E>(ex: E, task_id: &str) -> DbResult<Vec<EditRecordRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, EditRecordRow>(
        "SELECT * FROM edit_records WHERE task_id = ? ORDER BY id",
    )
    .bind(task_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::task_repo;
    use crate::db::DatabaseConnection;

    async fn db() -> DatabaseConnection {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        task_repo::create(db.pool(), "task-1", "u1", "t").await.unwrap();
        db
    }

    fn sample_intent() -> IntentAnalysis {
        IntentAnalysis {
            parsed_goal: "Learn Go".to_string(),
            key_technologies: vec!["go".to_string()],
            difficulty_profile: "beginner".to_string(),
            time_constraint: "10h/week".to_string(),
            skill_gap_analysis: vec![],
            personalized_suggestions: vec![],
        }
    }

    #[tokio::test]
    async fn test_intent_upsert_is_idempotent() {
        let db = db().await;
        for _ in 0..2 {
            let mut tx = db.pool().begin().await.unwrap();
            upsert_intent(&mut tx, "task-1", &sample_intent()).await.unwrap();
            tx.commit().await.unwrap();
        }

        let row = intent(db.pool(), "task-1").await.unwrap().unwrap();
        assert_eq!(row.parsed_goal, "Learn Go");
    }

    #[tokio::test]
    async fn test_edit_record_replay_absorbed() {
        let db = db().await;
        for _ in 0..2 {
            let mut tx = db.pool().begin().await.unwrap();
            insert_edit_record(
                &mut tx,
                "task-1",
                EditSource::ValidationFailed,
                &["c1".to_string()],
                1,
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        let rows = edit_records(db.pool(), "task-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].edit_source, "validation_failed");
        assert_eq!(rows[0].round_policy, "continue");
    }

    #[tokio::test]
    async fn test_validation_rounds_accumulate() {
        let db = db().await;
        for round in 1..=3u32 {
            let result = ValidationResult {
                overall_score: 70.0 + round as f64,
                dimension_scores: vec![],
                issues: vec![],
                improvement_suggestions: vec![],
                validation_round: round,
                is_valid: round == 3,
                validation_summary: String::new(),
            };
            let mut tx = db.pool().begin().await.unwrap();
            upsert_validation(&mut tx, "task-1", &result).await.unwrap();
            tx.commit().await.unwrap();
        }

        let rows = validations(db.pool(), "task-1").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].is_valid, 1);
    }
}
