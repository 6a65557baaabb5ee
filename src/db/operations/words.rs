use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::db::Database;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub headword: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    pub examples: Vec<String>,
    pub category: String,
    pub section: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub headword: String,
    pub translation: String,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub category: String,
    #[serde(default = "default_section")]
    pub section: i64,
    #[serde(default)]
    pub audio_file: Option<String>,
}

fn default_section() -> i64 {
    1
}

impl NewWord {
    pub fn validate(&self) -> Result<(), String> {
        if self.headword.trim().is_empty() {
            return Err("headword must not be empty".to_string());
        }
        if self.translation.trim().is_empty() {
            return Err(format!("translation for '{}' must not be empty", self.headword.trim()));
        }
        if self.category.trim().is_empty() {
            return Err(format!("category for '{}' must not be empty", self.headword.trim()));
        }
        if self.section < 1 {
            return Err(format!("section for '{}' must be at least 1", self.headword.trim()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub word_count: i64,
    pub section_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub section: i64,
    pub word_count: i64,
}

const WORD_COLUMNS: &str = r#""id","headword","translation","phonetic","examples","category","section","audioFile","createdAt""#;

pub async fn list_categories(db: &Database) -> Result<Vec<CategorySummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "category", COUNT(*) AS "wordCount", COUNT(DISTINCT "section") AS "sectionCount"
        FROM "words"
        GROUP BY "category"
        ORDER BY "category" ASC
        "#,
    )
    .fetch_all(db.pool())
    .await?;

    rows.iter()
        .map(|row| -> Result<CategorySummary, sqlx::Error> {
            Ok(CategorySummary {
                category: row.try_get("category")?,
                word_count: row.try_get("wordCount")?,
                section_count: row.try_get("sectionCount")?,
            })
        })
        .collect()
}

pub async fn list_sections(
    db: &Database,
    category: &str,
) -> Result<Vec<SectionSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "section", COUNT(*) AS "wordCount"
        FROM "words"
        WHERE "category" = ?
        GROUP BY "section"
        ORDER BY "section" ASC
        "#,
    )
    .bind(category)
    .fetch_all(db.pool())
    .await?;

    rows.iter()
        .map(|row| -> Result<SectionSummary, sqlx::Error> {
            Ok(SectionSummary {
                section: row.try_get("section")?,
                word_count: row.try_get("wordCount")?,
            })
        })
        .collect()
}

pub async fn list_words(
    db: &Database,
    category: &str,
    section: Option<i64>,
) -> Result<Vec<Word>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        r#"SELECT {WORD_COLUMNS} FROM "words" WHERE "category" = "#
    ));
    qb.push_bind(category);
    if let Some(section) = section {
        qb.push(r#" AND "section" = "#);
        qb.push_bind(section);
    }
    qb.push(r#" ORDER BY "section" ASC, "id" ASC"#);

    let rows = qb.build().fetch_all(db.pool()).await?;
    rows.iter().map(map_word_row).collect()
}

pub async fn list_all_words(db: &Database) -> Result<Vec<Word>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {WORD_COLUMNS} FROM "words" ORDER BY "category" ASC, "section" ASC, "id" ASC"#
    ))
    .fetch_all(db.pool())
    .await?;
    rows.iter().map(map_word_row).collect()
}

pub async fn get_word(db: &Database, word_id: i64) -> Result<Option<Word>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {WORD_COLUMNS} FROM "words" WHERE "id" = ? LIMIT 1"#
    ))
    .bind(word_id)
    .fetch_optional(db.pool())
    .await?;
    row.as_ref().map(map_word_row).transpose()
}

pub async fn search_words(
    db: &Database,
    query: &str,
    limit: i64,
) -> Result<Vec<Word>, sqlx::Error> {
    let term = search_key(query);
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let escaped = escape_like(&term);
    let pattern = format!("%{escaped}%");
    let prefix_pattern = format!("{escaped}%");

    let rows = sqlx::query(&format!(
        r#"
        SELECT {WORD_COLUMNS}
        FROM "words"
        WHERE "headwordKey" LIKE ?1 ESCAPE '\'
           OR "translationKey" LIKE ?1 ESCAPE '\'
        ORDER BY
          CASE
            WHEN "headwordKey" = ?2 THEN 0
            WHEN "headwordKey" LIKE ?3 ESCAPE '\' THEN 1
            ELSE 2
          END,
          "headword" ASC,
          "id" ASC
        LIMIT ?4
        "#
    ))
    .bind(&pattern)
    .bind(&term)
    .bind(&prefix_pattern)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;

    rows.iter().map(map_word_row).collect()
}

pub async fn count_words(db: &Database) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(db.pool())
        .await
}

/// Inserts the words in one transaction and returns how many rows were new.
/// Entries whose headword already exists in the same category are skipped.
pub async fn insert_words(db: &Database, words: &[NewWord]) -> Result<u64, sqlx::Error> {
    let now = Utc::now();
    let mut tx = db.pool().begin().await?;
    let mut inserted = 0;

    for word in words {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO "words"
              ("headword","translation","phonetic","examples","category","section","audioFile","createdAt",
               "headwordKey","translationKey")
            VALUES (?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(word.headword.trim())
        .bind(word.translation.trim())
        .bind(word.phonetic.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .bind(Json(&word.examples))
        .bind(word.category.trim())
        .bind(word.section)
        .bind(word.audio_file.as_deref())
        .bind(now)
        .bind(search_key(&word.headword))
        .bind(search_key(&word.translation))
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, sqlx::Error> {
    let examples: Json<Vec<String>> = row.try_get("examples")?;
    Ok(Word {
        id: row.try_get("id")?,
        headword: row.try_get("headword")?,
        translation: row.try_get("translation")?,
        phonetic: row.try_get("phonetic")?,
        examples: examples.0,
        category: row.try_get("category")?,
        section: row.try_get("section")?,
        audio_file: row.try_get("audioFile")?,
        created_at: row.try_get("createdAt")?,
    })
}

/// Case-folded form matched by search, for both stored text and queries.
fn search_key(text: &str) -> String {
    text.trim().to_lowercase()
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out
}
