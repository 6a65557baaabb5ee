mod categories;
mod health;
mod progress;
mod quiz;
mod review;
mod statistics;
mod study_sessions;
mod words;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::{verify_request, AuthUser};
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/categories", categories::router())
        .nest("/api/words", words::router())
        .nest("/api/progress", progress::router())
        .nest("/api/review", review::router())
        .nest("/api/quiz", quiz::router())
        .nest("/api/study-sessions", study_sessions::router())
        .nest("/api/statistics", statistics::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Resolves the caller from the request's bearer token or cookie.
fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    Ok(verify_request(headers, state.jwt_secret())?)
}

/// Clamps an optional `limit` query parameter into `1..=max`.
fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
