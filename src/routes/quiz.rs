use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::clamp_limit;
use crate::services::deck::{distractor_pool, DeckSource};
use crate::services::quiz::{generate_quiz, QuizDirection};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(quiz))
}

#[derive(Debug, Deserialize)]
struct QuizQuery {
    category: Option<String>,
    section: Option<i64>,
    count: Option<i64>,
    direction: Option<String>,
}

async fn quiz(
    State(state): State<AppState>,
    Query(query): Query<QuizQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("category is required"))?;
    let direction = match query.direction.as_deref() {
        Some(raw) => raw.parse::<QuizDirection>().map_err(AppError::validation)?,
        None => QuizDirection::default(),
    };
    let count = clamp_limit(query.count, 10, 50) as usize;
    let option_count = state.config().quiz_option_count;

    let provider = state.provider();
    let targets = provider.list_words(category, query.section).await?;
    if targets.is_empty() {
        return Err(AppError::not_found("No words found for this category"));
    }

    let source = DeckSource {
        category: Some(category.to_string()),
        section: query.section,
        direction,
    };
    let pool = distractor_pool(provider, &source, option_count).await?;

    let questions = {
        let mut rng = rand::rng();
        generate_quiz(&targets, &pool, count, option_count, direction, &mut rng)
    };
    Ok(ok(questions))
}
