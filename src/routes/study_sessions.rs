use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::operations::StudySessionRecord;
use crate::response::{ok, AppError};
use crate::routes::{clamp_limit, require_user};
use crate::services::deck::{build_deck, DeckSource};
use crate::services::quiz::QuizDirection;
use crate::services::study_session::{
    ActiveSession, AnswerInput, AnswerOutcome, AnswerRequest, SessionError, SessionSnapshot,
    StudyMode,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/history", get(history))
        .route("/:id", get(get_session))
        .route("/:id/reveal", post(reveal))
        .route("/:id/answer", post(answer))
        .route("/:id/finish", post(finish))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    mode: StudyMode,
    category: Option<String>,
    section: Option<i64>,
    #[serde(default)]
    direction: QuizDirection,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerResponse {
    outcome: AnswerOutcome,
    session: SessionSnapshot,
    /// Present once the answer finished the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<StudySessionRecord>,
}

async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;

    let category = payload
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    if payload.mode != StudyMode::Review && category.is_none() {
        return Err(AppError::validation(format!(
            "{} sessions require a category",
            payload.mode
        )));
    }
    if matches!(payload.section, Some(section) if section < 1) {
        return Err(AppError::validation("section must be at least 1"));
    }

    let source = DeckSource {
        category,
        section: payload.section,
        direction: payload.direction,
    };
    let now = Utc::now();
    let deck = build_deck(
        state.provider(),
        &user.id,
        payload.mode,
        &source,
        state.config().quiz_option_count,
        now,
    )
    .await?;

    let session = ActiveSession::new(
        Uuid::new_v4().to_string(),
        &user.id,
        payload.mode,
        source.category,
        source.section,
        deck,
        now,
    )?;
    let snapshot = session.snapshot();
    state.sessions().insert(session);

    tracing::debug!(session_id = %snapshot.id, user_id = %user.id, mode = %payload.mode, "study session started");
    Ok((StatusCode::CREATED, ok(snapshot)))
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let snapshot = state.sessions().with_session(&id, &user.id, |s| s.snapshot())?;
    Ok(ok(snapshot))
}

async fn reveal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let card = state
        .sessions()
        .with_session(&id, &user.id, |s| s.reveal(Utc::now()))??;
    Ok(ok(card))
}

async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let input = AnswerInput::try_from(payload)?;
    let now = Utc::now();

    // The card stays current until the mastery write succeeds; an error
    // drops the guard and the same card can be answered again.
    let (pending, guard) = state.sessions_arc().begin_answer(&id, &user.id, input)?;
    state
        .provider()
        .record_answer(&user.id, pending.word_id, pending.correct, now)
        .await?;

    let (outcome, snapshot, summary) = guard.commit(|session| {
        let outcome = session.commit_answer(pending, now);
        let summary = session.is_finished().then(|| session.summary(now));
        (outcome, session.snapshot(), summary)
    })?;

    if let Some(record) = &summary {
        persist_and_remove(&state, &id, &user.id, record).await?;
    }

    Ok(ok(AnswerResponse {
        outcome,
        session: snapshot,
        record: summary,
    }))
}

/// Ends the session early (or after the last card) and records it.
async fn finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let record = state.sessions().with_session(&id, &user.id, |s| {
        if s.is_answer_pending() {
            return Err(SessionError::AnswerPending);
        }
        Ok(s.summary(Utc::now()))
    })??;
    persist_and_remove(&state, &id, &user.id, &record).await?;
    Ok(ok(record))
}

/// The session leaves the store only once its record is stored, so a failed
/// write can be retried through `finish`. Recording is idempotent per id.
async fn persist_and_remove(
    state: &AppState,
    session_id: &str,
    user_id: &str,
    record: &StudySessionRecord,
) -> Result<(), AppError> {
    state.provider().record_session(record).await?;
    if state.sessions().remove(session_id, user_id).is_err() {
        tracing::debug!(session_id, "study session already removed");
    }
    Ok(())
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let limit = clamp_limit(query.limit, 20, 100);
    let sessions = state.provider().list_sessions(&user.id, limit).await?;
    Ok(ok(sessions))
}
