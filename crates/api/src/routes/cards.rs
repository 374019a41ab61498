use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, post, put},
    Extension, Json, Router,
};
use sqlx::types::Uuid;

use linkcard_cards::{CardInput, QrInput};

use crate::middleware::authenticate_owner;
use crate::response::GenericResponse;
use crate::state::AppState;

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", post(create_card)
            .route_layer(middleware::from_fn(authenticate_owner))
        )
        .route("/cards/{card_id}", put(update_card)
            .route_layer(middleware::from_fn(authenticate_owner))
        )
        .route("/cards/{card_id}", delete(delete_card)
            .route_layer(middleware::from_fn(authenticate_owner))
        )
        .route("/cards/{card_id}/qr", post(regenerate_qr)
            .route_layer(middleware::from_fn(authenticate_owner))
        )
}

async fn create_card(
    State(state): State<AppState>,
    Extension(owner_id): Extension<Uuid>,
    Json(payload): Json<CardInput>,
) -> GenericResponse {
    match state.cards.create(&payload, &owner_id).await {
        Ok(response) => response.into(),
        Err(e) => e.into(),
    }
}

async fn update_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Extension(owner_id): Extension<Uuid>,
    Json(payload): Json<CardInput>,
) -> GenericResponse {
    match state.cards.update(&card_id, &payload, &owner_id).await {
        Ok(response) => response.into(),
        Err(e) => e.into(),
    }
}

async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Extension(owner_id): Extension<Uuid>,
) -> GenericResponse {
    match state.cards.delete(&card_id, &owner_id).await {
        Ok(response) => response.into(),
        Err(e) => e.into(),
    }
}

async fn regenerate_qr(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Extension(owner_id): Extension<Uuid>,
    Json(payload): Json<QrInput>,
) -> GenericResponse {
    match state
        .cards
        .regenerate_qr(&card_id, &owner_id, payload.logo.as_deref())
        .await
    {
        Ok(response) => response.into(),
        Err(e) => e.into(),
    }
}
