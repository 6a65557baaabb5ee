use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::response::{json_error, ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/:category/sections", get(list_sections))
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = state.provider().list_categories().await?;
    Ok(ok(categories))
}

async fn list_sections(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sections = state.provider().list_sections(&category).await?;
    if sections.is_empty() {
        return Err(json_error(
            StatusCode::NOT_FOUND,
            "CATEGORY_NOT_FOUND",
            format!("Category '{category}' does not exist"),
        ));
    }
    Ok(ok(sections))
}
