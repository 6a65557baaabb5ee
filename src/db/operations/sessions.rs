use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::Database;
use crate::services::study_session::StudyMode;

/// A completed study run as persisted for history and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionRecord {
    pub id: String,
    pub user_id: String,
    pub mode: StudyMode,
    pub category: Option<String>,
    pub section: Option<i64>,
    pub words_studied: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// Storing the same session id twice keeps the first record.
pub async fn insert_session(db: &Database, record: &StudySessionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO "study_sessions"
          ("id", "userId", "mode", "category", "section", "wordsStudied", "correctCount",
           "incorrectCount", "startedAt", "completedAt", "durationSeconds")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(record.mode.as_str())
    .bind(record.category.as_deref())
    .bind(record.section)
    .bind(record.words_studied)
    .bind(record.correct_count)
    .bind(record.incorrect_count)
    .bind(record.started_at)
    .bind(record.completed_at)
    .bind(record.duration_seconds)
    .execute(db.pool())
    .await?;
    Ok(())
}

pub async fn list_sessions(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<StudySessionRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id", "userId", "mode", "category", "section", "wordsStudied", "correctCount",
               "incorrectCount", "startedAt", "completedAt", "durationSeconds"
        FROM "study_sessions"
        WHERE "userId" = ?
        ORDER BY "completedAt" DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    rows.iter().map(map_session_row).collect()
}

/// All sessions of a user, oldest first. Statistics need the full history
/// to compute streaks.
pub async fn list_all_sessions(
    db: &Database,
    user_id: &str,
) -> Result<Vec<StudySessionRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id", "userId", "mode", "category", "section", "wordsStudied", "correctCount",
               "incorrectCount", "startedAt", "completedAt", "durationSeconds"
        FROM "study_sessions"
        WHERE "userId" = ?
        ORDER BY "completedAt" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;
    rows.iter().map(map_session_row).collect()
}

fn map_session_row(row: &SqliteRow) -> Result<StudySessionRecord, sqlx::Error> {
    let mode: String = row.try_get("mode")?;
    let mode = mode.parse::<StudyMode>().map_err(|err| sqlx::Error::ColumnDecode {
        index: "mode".to_string(),
        source: err.into(),
    })?;

    Ok(StudySessionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        mode,
        category: row.try_get("category")?,
        section: row.try_get("section")?,
        words_studied: row.try_get("wordsStudied")?,
        correct_count: row.try_get("correctCount")?,
        incorrect_count: row.try_get("incorrectCount")?,
        started_at: row.try_get("startedAt")?,
        completed_at: row.try_get("completedAt")?,
        duration_seconds: row.try_get("durationSeconds")?,
    })
}
