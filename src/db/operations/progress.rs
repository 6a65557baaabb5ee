use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection};

use crate::db::operations::words::{map_word_row, Word};
use crate::db::Database;
use crate::services::mastery;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub word_id: i64,
    pub mastery_level: f64,
    pub study_count: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub last_studied_at: Option<DateTime<Utc>>,
    pub is_favorite: bool,
}

impl UserProgress {
    pub fn new(user_id: impl Into<String>, word_id: i64) -> Self {
        Self {
            user_id: user_id.into(),
            word_id,
            mastery_level: 0.0,
            study_count: 0,
            correct_count: 0,
            incorrect_count: 0,
            last_studied_at: None,
            is_favorite: false,
        }
    }

    pub fn is_studied(&self) -> bool {
        self.study_count > 0
    }
}

/// A progress row together with the word it tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub word: Word,
}

const PROGRESS_COLUMNS: &str = r#"p."userId", p."wordId", p."masteryLevel", p."studyCount", p."correctCount", p."incorrectCount", p."lastStudiedAt", p."isFavorite""#;
const JOINED_WORD_COLUMNS: &str = r#"w."id", w."headword", w."translation", w."phonetic", w."examples", w."category", w."section", w."audioFile", w."createdAt""#;

pub async fn get_progress(
    db: &Database,
    user_id: &str,
    word_id: i64,
) -> Result<Option<UserProgress>, sqlx::Error> {
    let mut conn = db.pool().acquire().await?;
    select_progress(&mut conn, user_id, word_id).await
}

pub async fn list_progress_entries(
    db: &Database,
    user_id: &str,
    category: Option<&str>,
) -> Result<Vec<ProgressEntry>, sqlx::Error> {
    let mut qb = sqlx::QueryBuilder::<Sqlite>::new(format!(
        r#"
        SELECT {PROGRESS_COLUMNS}, {JOINED_WORD_COLUMNS}
        FROM "user_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = "#
    ));
    qb.push_bind(user_id);
    if let Some(category) = category {
        qb.push(r#" AND w."category" = "#);
        qb.push_bind(category);
    }
    qb.push(r#" ORDER BY w."category" ASC, w."section" ASC, w."id" ASC"#);

    let rows = qb.build().fetch_all(db.pool()).await?;
    rows.iter().map(map_entry_row).collect()
}

pub async fn list_favorites(db: &Database, user_id: &str) -> Result<Vec<ProgressEntry>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {PROGRESS_COLUMNS}, {JOINED_WORD_COLUMNS}
        FROM "user_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = ? AND p."isFavorite" = 1
        ORDER BY w."headword" ASC
        "#
    ))
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;
    rows.iter().map(map_entry_row).collect()
}

/// Applies one answer to the stored progress inside a transaction and
/// returns the updated row. The caller has already checked the word exists.
pub async fn record_answer(
    db: &Database,
    user_id: &str,
    word_id: i64,
    correct: bool,
    now: DateTime<Utc>,
) -> Result<UserProgress, sqlx::Error> {
    let mut tx = db.pool().begin().await?;

    // Writing first takes the write lock up front, so concurrent answers wait
    // on the busy timeout instead of failing a read-to-write upgrade.
    sqlx::query(
        r#"
        INSERT INTO "user_progress" ("userId", "wordId") VALUES (?, ?)
        ON CONFLICT ("userId", "wordId") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(word_id)
    .execute(&mut *tx)
    .await?;

    let current = select_progress(&mut tx, user_id, word_id)
        .await?
        .unwrap_or_else(|| UserProgress::new(user_id, word_id));
    let updated = mastery::apply_answer(&current, correct, now);
    upsert_progress(&mut tx, &updated).await?;

    tx.commit().await?;
    Ok(updated)
}

pub async fn set_favorite(
    db: &Database,
    user_id: &str,
    word_id: i64,
    favorite: bool,
) -> Result<UserProgress, sqlx::Error> {
    let mut tx = db.pool().begin().await?;

    sqlx::query(
        r#"
        INSERT INTO "user_progress" ("userId", "wordId", "isFavorite")
        VALUES (?, ?, ?)
        ON CONFLICT ("userId", "wordId") DO UPDATE SET "isFavorite" = excluded."isFavorite"
        "#,
    )
    .bind(user_id)
    .bind(word_id)
    .bind(favorite)
    .execute(&mut *tx)
    .await?;

    let progress = select_progress(&mut tx, user_id, word_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;
    Ok(progress)
}

async fn select_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_id: i64,
) -> Result<Option<UserProgress>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {PROGRESS_COLUMNS} FROM "user_progress" p WHERE p."userId" = ? AND p."wordId" = ?"#
    ))
    .bind(user_id)
    .bind(word_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_progress_row).transpose()
}

async fn upsert_progress(
    conn: &mut SqliteConnection,
    progress: &UserProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "user_progress"
          ("userId", "wordId", "masteryLevel", "studyCount", "correctCount", "incorrectCount", "lastStudiedAt", "isFavorite")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("userId", "wordId") DO UPDATE SET
          "masteryLevel" = excluded."masteryLevel",
          "studyCount" = excluded."studyCount",
          "correctCount" = excluded."correctCount",
          "incorrectCount" = excluded."incorrectCount",
          "lastStudiedAt" = excluded."lastStudiedAt"
        "#,
    )
    .bind(&progress.user_id)
    .bind(progress.word_id)
    .bind(progress.mastery_level)
    .bind(progress.study_count)
    .bind(progress.correct_count)
    .bind(progress.incorrect_count)
    .bind(progress.last_studied_at)
    .bind(progress.is_favorite)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn map_progress_row(row: &SqliteRow) -> Result<UserProgress, sqlx::Error> {
    Ok(UserProgress {
        user_id: row.try_get("userId")?,
        word_id: row.try_get("wordId")?,
        mastery_level: row.try_get("masteryLevel")?,
        study_count: row.try_get("studyCount")?,
        correct_count: row.try_get("correctCount")?,
        incorrect_count: row.try_get("incorrectCount")?,
        last_studied_at: row.try_get("lastStudiedAt")?,
        is_favorite: row.try_get("isFavorite")?,
    })
}

fn map_entry_row(row: &SqliteRow) -> Result<ProgressEntry, sqlx::Error> {
    Ok(ProgressEntry {
        progress: map_progress_row(row)?,
        word: map_word_row(row)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::operations::words::{insert_words, list_all_words, NewWord};

    async fn seeded_db() -> (Database, Vec<Word>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let words = ["cat", "dog"]
            .iter()
            .map(|headword| NewWord {
                headword: headword.to_string(),
                translation: format!("{headword}-t"),
                phonetic: None,
                examples: Vec::new(),
                category: "animals".to_string(),
                section: 1,
                audio_file: None,
            })
            .collect::<Vec<_>>();
        insert_words(&db, &words).await.unwrap();
        let words = list_all_words(&db).await.unwrap();
        (db, words)
    }

    #[tokio::test]
    async fn first_answer_creates_progress() {
        let (db, words) = seeded_db().await;
        let now = DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let progress = record_answer(&db, "u1", words[0].id, true, now).await.unwrap();
        assert_eq!(progress.study_count, 1);
        assert_eq!(progress.correct_count, 1);
        assert!((progress.mastery_level - mastery::CORRECT_DELTA).abs() < 1e-9);

        let stored = get_progress(&db, "u1", words[0].id).await.unwrap().unwrap();
        assert_eq!(stored, progress);
        assert!(get_progress(&db, "u2", words[0].id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_answers_on_one_word_all_count() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("progress.db").display());
        let db = Database::connect(&url).await.unwrap();
        insert_words(
            &db,
            &[NewWord {
                headword: "owl".to_string(),
                translation: "búho".to_string(),
                phonetic: None,
                examples: Vec::new(),
                category: "animals".to_string(),
                section: 1,
                audio_file: None,
            }],
        )
        .await
        .unwrap();
        let word_id = list_all_words(&db).await.unwrap()[0].id;

        let tasks: Vec<_> = (0..12)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move { record_answer(&db, "u1", word_id, i % 3 != 0, Utc::now()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = get_progress(&db, "u1", word_id).await.unwrap().unwrap();
        assert_eq!(stored.study_count, 12);
        assert_eq!(stored.correct_count, 8);
        assert_eq!(stored.incorrect_count, 4);
        db.close().await;
    }

    #[tokio::test]
    async fn favorite_survives_answers() {
        let (db, words) = seeded_db().await;
        let fav = set_favorite(&db, "u1", words[1].id, true).await.unwrap();
        assert!(fav.is_favorite);
        assert_eq!(fav.study_count, 0);

        let after = record_answer(&db, "u1", words[1].id, false, Utc::now())
            .await
            .unwrap();
        assert!(after.is_favorite);
        assert_eq!(after.incorrect_count, 1);

        let favorites = list_favorites(&db, "u1").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].word.headword, "dog");
    }

    #[tokio::test]
    async fn entries_filter_by_category() {
        let (db, words) = seeded_db().await;
        record_answer(&db, "u1", words[0].id, true, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            list_progress_entries(&db, "u1", Some("animals"))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(list_progress_entries(&db, "u1", Some("food"))
            .await
            .unwrap()
            .is_empty());
    }
}
