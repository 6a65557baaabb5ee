use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(statistics))
}

async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let stats = state.provider().statistics(&user.id, Utc::now()).await?;
    Ok(ok(stats))
}
