pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod workers;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::CacheLayer;
use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::services::DataProvider;
use crate::state::AppState;

/// Opens the database, picks the cache backend and seeds an empty catalog.
pub async fn build_state(config: Config) -> Result<AppState, DbInitError> {
    let db = Database::connect(&config.database_url).await?;
    let cache = CacheLayer::from_url(config.redis_url.as_deref()).await;
    let provider = DataProvider::new(
        db,
        cache,
        config.catalog_cache_ttl,
        config.progress_cache_ttl,
    );

    seed::seed_if_configured(&provider, config.seed_words_path.as_deref()).await;

    Ok(AppState::new(config, provider))
}

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
