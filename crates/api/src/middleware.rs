use anyhow::anyhow;
use axum::body::Body;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::{extract::Request, response::Response};
use sqlx::types::Uuid;

use crate::response::AppError;

pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// Resolves the calling owner from the `X-Owner-Id` header and stashes it as
/// a request extension. Requests without a parseable owner id are rejected
/// before any handler runs.
pub async fn authenticate_owner(mut req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let owner_id = req
        .headers()
        .get(OWNER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| {
            AppError::new(
                StatusCode::UNAUTHORIZED,
                anyhow!("missing or invalid X-Owner-Id header"),
            )
        })?;

    req.extensions_mut().insert(owner_id);
    Ok(next.run(req).await)
}
