use std::path::Path;

use thiserror::Error;

use crate::db::operations::NewWord;
use crate::services::data_provider::{DataProvider, ImportError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file is not a JSON word list: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Imports the word list at `path` when the catalog is still empty and
/// returns how many words were inserted.
pub async fn seed_words_from_file(provider: &DataProvider, path: &Path) -> Result<u64, SeedError> {
    let existing = provider.count_words().await?;
    if existing > 0 {
        tracing::debug!(existing, "catalog already populated, skipping seed");
        return Ok(0);
    }

    let raw = tokio::fs::read_to_string(path).await?;
    let words: Vec<NewWord> = serde_json::from_str(&raw)?;
    let inserted = provider.import_words(&words).await?;
    tracing::info!(inserted, path = %path.display(), "seeded word catalog");
    Ok(inserted)
}

/// Start-up wrapper: a missing or broken seed file is logged, never fatal.
pub async fn seed_if_configured(provider: &DataProvider, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "seed file not found, skipping");
        return;
    }
    if let Err(err) = seed_words_from_file(provider, path).await {
        tracing::warn!(error = %err, path = %path.display(), "failed to seed word catalog");
    }
}
