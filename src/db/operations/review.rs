use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::db::operations::words::{map_word_row, Word};
use crate::db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub word_id: i64,
    pub added_at: DateTime<Utc>,
    pub word: Word,
}

/// Returns `true` when the word was newly added; re-adding keeps the
/// first timestamp.
pub async fn add_review_word(
    db: &Database,
    user_id: &str,
    word_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT OR IGNORE INTO "review_words" ("userId", "wordId", "addedAt") VALUES (?, ?, ?)"#,
    )
    .bind(user_id)
    .bind(word_id)
    .bind(now)
    .execute(db.pool())
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_review_word(
    db: &Database,
    user_id: &str,
    word_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "review_words" WHERE "userId" = ? AND "wordId" = ?"#)
        .bind(user_id)
        .bind(word_id)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_review_words(db: &Database, user_id: &str) -> Result<Vec<ReviewEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT r."addedAt",
               w."id", w."headword", w."translation", w."phonetic", w."examples",
               w."category", w."section", w."audioFile", w."createdAt"
        FROM "review_words" r
        JOIN "words" w ON w."id" = r."wordId"
        WHERE r."userId" = ?
        ORDER BY r."addedAt" DESC, w."id" DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;

    rows.iter()
        .map(|row| -> Result<ReviewEntry, sqlx::Error> {
            let word = map_word_row(row)?;
            Ok(ReviewEntry {
                word_id: word.id,
                added_at: row.try_get("addedAt")?,
                word,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::operations::words::{insert_words, list_all_words, NewWord};

    #[tokio::test]
    async fn add_is_idempotent_and_remove_reports_presence() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        insert_words(
            &db,
            &[NewWord {
                headword: "river".to_string(),
                translation: "río".to_string(),
                phonetic: Some("/ˈrɪvər/".to_string()),
                examples: Vec::new(),
                category: "nature".to_string(),
                section: 1,
                audio_file: None,
            }],
        )
        .await
        .unwrap();
        let word_id = list_all_words(&db).await.unwrap()[0].id;

        let first = DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(add_review_word(&db, "u1", word_id, first).await.unwrap());
        assert!(!add_review_word(&db, "u1", word_id, first + chrono::Duration::hours(1))
            .await
            .unwrap());

        let listed = list_review_words(&db, "u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].added_at, first);
        assert_eq!(listed[0].word.phonetic.as_deref(), Some("/ˈrɪvər/"));

        assert!(remove_review_word(&db, "u1", word_id).await.unwrap());
        assert!(!remove_review_word(&db, "u1", word_id).await.unwrap());
        assert!(list_review_words(&db, "u1").await.unwrap().is_empty());
    }
}
