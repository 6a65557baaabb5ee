use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{keys, CacheLayer};
use crate::db::operations::{
    progress, review, sessions, words, CategorySummary, NewWord, ProgressEntry, ReviewEntry,
    SectionSummary, StudySessionRecord, UserProgress, Word,
};
use crate::db::Database;
use crate::services::srs;
use crate::services::statistics::{self, StudyStatistics};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("word #{index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A studied word whose review date has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueWord {
    #[serde(flatten)]
    pub entry: ProgressEntry,
    pub next_review_at: DateTime<Utc>,
    pub overdue_seconds: i64,
}

/// Single access path from handlers to storage. Reads go through the cache,
/// writes revalidate the tags they touch before returning.
pub struct DataProvider {
    db: Database,
    cache: CacheLayer,
    catalog_ttl: Duration,
    user_ttl: Duration,
}

impl DataProvider {
    pub fn new(db: Database, cache: CacheLayer, catalog_ttl: Duration, user_ttl: Duration) -> Self {
        Self {
            db,
            cache,
            catalog_ttl,
            user_ttl,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    async fn cached<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        tag: String,
        load: F,
    ) -> Result<T, sqlx::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        if let Some(hit) = self.cache.get::<T>(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.cache.set(key, &value, ttl, &[tag]).await;
        Ok(value)
    }

    async fn catalog<T, F, Fut>(&self, key: &str, load: F) -> Result<T, sqlx::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.cached(key, self.catalog_ttl, keys::CATALOG_TAG.to_string(), load)
            .await
    }

    async fn per_user<T, F, Fut>(&self, user_id: &str, key: &str, load: F) -> Result<T, sqlx::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.cached(key, self.user_ttl, keys::user_tag(user_id), load)
            .await
    }

    async fn revalidate_user(&self, user_id: &str) {
        self.cache.invalidate_tag(&keys::user_tag(user_id)).await;
    }

    // Catalog

    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>, sqlx::Error> {
        self.catalog(keys::categories_key(), || words::list_categories(&self.db))
            .await
    }

    pub async fn list_sections(&self, category: &str) -> Result<Vec<SectionSummary>, sqlx::Error> {
        self.catalog(&keys::sections_key(category), || {
            words::list_sections(&self.db, category)
        })
        .await
    }

    pub async fn list_words(
        &self,
        category: &str,
        section: Option<i64>,
    ) -> Result<Vec<Word>, sqlx::Error> {
        self.catalog(&keys::words_key(category, section), || {
            words::list_words(&self.db, category, section)
        })
        .await
    }

    pub async fn list_all_words(&self) -> Result<Vec<Word>, sqlx::Error> {
        self.catalog(keys::all_words_key(), || words::list_all_words(&self.db))
            .await
    }

    pub async fn get_word(&self, word_id: i64) -> Result<Option<Word>, sqlx::Error> {
        self.catalog(&keys::word_key(word_id), || words::get_word(&self.db, word_id))
            .await
    }

    pub async fn search_words(&self, query: &str, limit: i64) -> Result<Vec<Word>, sqlx::Error> {
        words::search_words(&self.db, query, limit).await
    }

    pub async fn count_words(&self) -> Result<i64, sqlx::Error> {
        words::count_words(&self.db).await
    }

    /// Validates every entry first; nothing is written when one is invalid.
    pub async fn import_words(&self, new_words: &[NewWord]) -> Result<u64, ImportError> {
        for (index, word) in new_words.iter().enumerate() {
            word.validate()
                .map_err(|reason| ImportError::Invalid { index, reason })?;
        }
        let inserted = words::insert_words(&self.db, new_words).await?;
        self.cache.invalidate_tag(keys::CATALOG_TAG).await;
        tracing::info!(inserted, submitted = new_words.len(), "words imported");
        Ok(inserted)
    }

    // Progress

    pub async fn list_progress(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<ProgressEntry>, sqlx::Error> {
        self.per_user(user_id, &keys::progress_key(user_id, category), || {
            progress::list_progress_entries(&self.db, user_id, category)
        })
        .await
    }

    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<ProgressEntry>, sqlx::Error> {
        self.per_user(user_id, &keys::favorites_key(user_id), || {
            progress::list_favorites(&self.db, user_id)
        })
        .await
    }

    pub async fn get_progress(
        &self,
        user_id: &str,
        word_id: i64,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        progress::get_progress(&self.db, user_id, word_id).await
    }

    /// `None` when the word does not exist.
    pub async fn record_answer(
        &self,
        user_id: &str,
        word_id: i64,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        if self.get_word(word_id).await?.is_none() {
            return Ok(None);
        }
        let updated = progress::record_answer(&self.db, user_id, word_id, correct, now).await?;
        self.revalidate_user(user_id).await;
        Ok(Some(updated))
    }

    pub async fn set_favorite(
        &self,
        user_id: &str,
        word_id: i64,
        favorite: bool,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        if self.get_word(word_id).await?.is_none() {
            return Ok(None);
        }
        let updated = progress::set_favorite(&self.db, user_id, word_id, favorite).await?;
        self.revalidate_user(user_id).await;
        Ok(Some(updated))
    }

    /// Studied words whose review date has passed, most overdue first.
    pub async fn due_words(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DueWord>, sqlx::Error> {
        let entries = self.list_progress(user_id, None).await?;
        let mut due: Vec<DueWord> = entries
            .into_iter()
            .filter_map(|entry| {
                let next_review_at = srs::next_review_at(&entry.progress)?;
                let overdue = srs::overdue_by(&entry.progress, now)?;
                Some(DueWord {
                    entry,
                    next_review_at,
                    overdue_seconds: overdue.num_seconds(),
                })
            })
            .collect();
        due.sort_by(|a, b| {
            b.overdue_seconds
                .cmp(&a.overdue_seconds)
                .then(a.entry.word.id.cmp(&b.entry.word.id))
        });
        due.truncate(limit);
        Ok(due)
    }

    // Review list

    pub async fn list_review(&self, user_id: &str) -> Result<Vec<ReviewEntry>, sqlx::Error> {
        self.per_user(user_id, &keys::review_key(user_id), || {
            review::list_review_words(&self.db, user_id)
        })
        .await
    }

    /// `None` when the word does not exist, otherwise whether it was newly
    /// added.
    pub async fn add_review(
        &self,
        user_id: &str,
        word_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<bool>, sqlx::Error> {
        if self.get_word(word_id).await?.is_none() {
            return Ok(None);
        }
        let added = review::add_review_word(&self.db, user_id, word_id, now).await?;
        self.revalidate_user(user_id).await;
        Ok(Some(added))
    }

    pub async fn remove_review(&self, user_id: &str, word_id: i64) -> Result<bool, sqlx::Error> {
        let removed = review::remove_review_word(&self.db, user_id, word_id).await?;
        self.revalidate_user(user_id).await;
        Ok(removed)
    }

    // Sessions and statistics

    pub async fn record_session(&self, record: &StudySessionRecord) -> Result<(), sqlx::Error> {
        sessions::insert_session(&self.db, record).await?;
        self.revalidate_user(&record.user_id).await;
        tracing::info!(
            session_id = %record.id,
            user_id = %record.user_id,
            mode = %record.mode,
            words = record.words_studied,
            "study session recorded"
        );
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<StudySessionRecord>, sqlx::Error> {
        sessions::list_sessions(&self.db, user_id, limit).await
    }

    pub async fn statistics(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StudyStatistics, sqlx::Error> {
        self.per_user(user_id, &keys::statistics_key(user_id), || async {
            let progress = self.list_progress(user_id, None).await?;
            let catalog = self.list_categories().await?;
            let review_size = self.list_review(user_id).await?.len() as i64;
            let history = sessions::list_all_sessions(&self.db, user_id).await?;
            Ok::<_, sqlx::Error>(statistics::aggregate(
                &progress,
                &catalog,
                review_size,
                &history,
                now,
            ))
        })
        .await
    }
}
