use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{json_error, ok, AppError};
use crate::routes::clamp_limit;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 20;
const MAX_SEARCH_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words))
        .route("/search", get(search_words))
        .route("/:id", get(get_word))
}

#[derive(Debug, Deserialize)]
struct ListWordsQuery {
    category: Option<String>,
    section: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<i64>,
}

async fn list_words(
    State(state): State<AppState>,
    Query(query): Query<ListWordsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let words = match (category, query.section) {
        (Some(category), section) => state.provider().list_words(category, section).await?,
        (None, Some(_)) => {
            return Err(AppError::validation("section requires a category"));
        }
        (None, None) => state.provider().list_all_words().await?,
    };
    Ok(ok(words))
}

async fn search_words(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "EMPTY_QUERY",
            "Search query must not be empty",
        ));
    }

    let limit = clamp_limit(query.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
    let words = state.provider().search_words(term, limit).await?;
    Ok(ok(words))
}

async fn get_word(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let word = state
        .provider()
        .get_word(id)
        .await?
        .ok_or_else(|| AppError::not_found("Word not found"))?;
    Ok(ok(word))
}
