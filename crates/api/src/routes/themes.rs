use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde_json::json;

use crate::response::{AppError, AppSuccess};
use crate::state::AppState;

pub fn theme_routes() -> Router<AppState> {
    Router::new().route("/themes", get(list_themes))
}

async fn list_themes(State(state): State<AppState>) -> Result<AppSuccess, AppError> {
    let themes = state.cards.catalog().themes();
    Ok(AppSuccess::new(
        StatusCode::OK,
        "themes fetched successfully",
        json!(themes),
    ))
}
