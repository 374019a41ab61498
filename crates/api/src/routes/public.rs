use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use sqlx::types::Uuid;

use crate::response::AppError;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/c/{card_id}", get(view_card))
}

/// The published page a card's QR code points at. World-readable, rendered
/// through the card's theme with the built-in fallback behind it.
async fn view_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let aggregate = state
        .cards
        .load_aggregate(&card_id)
        .await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow!(e)))?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("card not found")))?;

    let html = state
        .renderer
        .render(aggregate.theme(), &aggregate.render_context());
    Ok(Html(html))
}
