use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::db::operations::UserProgress;
use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_progress))
        .route("/favorites", get(list_favorites))
        .route("/:word_id", get(get_progress))
        .route("/:word_id/answer", post(record_answer))
        .route("/:word_id/favorite", put(set_favorite))
}

#[derive(Debug, Deserialize)]
struct ProgressQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    correct: bool,
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    favorite: bool,
}

fn word_not_found() -> AppError {
    AppError::not_found("Word not found")
}

async fn list_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProgressQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let entries = state.provider().list_progress(&user.id, category).await?;
    Ok(ok(entries))
}

async fn list_favorites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let entries = state.provider().list_favorites(&user.id).await?;
    Ok(ok(entries))
}

/// Words never studied report a zeroed progress.
async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let provider = state.provider();

    if provider.get_word(word_id).await?.is_none() {
        return Err(word_not_found());
    }
    let progress = provider
        .get_progress(&user.id, word_id)
        .await?
        .unwrap_or_else(|| UserProgress::new(&user.id, word_id));
    Ok(ok(progress))
}

async fn record_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word_id): Path<i64>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let progress = state
        .provider()
        .record_answer(&user.id, word_id, payload.correct, Utc::now())
        .await?
        .ok_or_else(word_not_found)?;
    Ok(ok(progress))
}

async fn set_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word_id): Path<i64>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let progress = state
        .provider()
        .set_favorite(&user.id, word_id, payload.favorite)
        .await?
        .ok_or_else(word_not_found)?;
    Ok(ok(progress))
}
