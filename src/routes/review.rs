use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::{clamp_limit, require_user};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_review).post(add_review))
        .route("/due", get(due_words))
        .route("/:word_id", delete(remove_review))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddReviewRequest {
    word_id: i64,
}

#[derive(Debug, Deserialize)]
struct DueQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewChange {
    word_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    added: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<bool>,
}

async fn list_review(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let entries = state.provider().list_review(&user.id).await?;
    Ok(ok(entries))
}

async fn add_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let added = state
        .provider()
        .add_review(&user.id, payload.word_id, Utc::now())
        .await?
        .ok_or_else(|| AppError::not_found("Word not found"))?;
    Ok(ok(ReviewChange {
        word_id: payload.word_id,
        added: Some(added),
        removed: None,
    }))
}

async fn remove_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let removed = state.provider().remove_review(&user.id, word_id).await?;
    Ok(ok(ReviewChange {
        word_id,
        added: None,
        removed: Some(removed),
    }))
}

async fn due_words(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let limit = clamp_limit(query.limit, 20, 100) as usize;
    let due = state.provider().due_words(&user.id, Utc::now(), limit).await?;
    Ok(ok(due))
}
