use std::collections::BTreeMap;

use serde_json::json;
use sqlx::types::Uuid;
use thiserror::Error;

use linkcard_assets::AssetError;

use crate::items::ItemOutcome;
use crate::response::CardResponse;
use crate::Card;

/// Field name to message, ordered for stable response bodies.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Create-path item failure: the card row was compensated away, but the
    /// response still echoes it together with per-index item outcomes.
    #[error("one or more items failed validation")]
    ItemsRejected {
        card: Card,
        outcomes: Vec<ItemOutcome>,
    },

    /// Update-path item failure: the surrounding transaction was rolled back.
    #[error("one or more items failed validation")]
    ItemSyncRejected(Vec<(usize, FieldErrors)>),

    #[error("card not found")]
    NotFound,

    #[error("not the owner of this card")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    /// Image or QR processing failed after the card row was persisted. The
    /// body carries the card id so the caller can find the card that now
    /// exists; a later Update or RegenerateQr can repair it.
    #[error("asset processing failed for card {card_id}")]
    ArtifactFailed {
        card_id: Uuid,
        #[source]
        source: AssetError,
    },

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl CardError {
    pub fn status(&self) -> u16 {
        match self {
            CardError::Validation(_)
            | CardError::ItemsRejected { .. }
            | CardError::ItemSyncRejected(_)
            | CardError::Conflict(_) => 422,
            CardError::NotFound => 404,
            CardError::Unauthorized => 401,
            CardError::ArtifactFailed { source, .. } if source.is_client_error() => 422,
            CardError::Asset(e) if e.is_client_error() => 422,
            CardError::ArtifactFailed { .. } | CardError::Asset(_) | CardError::Database(_) => 500,
        }
    }

    /// Builds the `{status, message, data}` body for this failure, including
    /// the rich 422 payloads the create/update item paths produce.
    pub fn to_response(&self) -> CardResponse {
        let message = self.to_string();
        let data = match self {
            CardError::Validation(errors) => json!({ "errors": errors }),
            CardError::ItemsRejected { card, outcomes } => {
                let mut created = Vec::new();
                let mut errors = BTreeMap::new();
                for (index, outcome) in outcomes.iter().enumerate() {
                    match outcome {
                        ItemOutcome::Created(item) => created.push(item),
                        ItemOutcome::Rejected(fields) => {
                            errors.insert(index.to_string(), fields.clone());
                        }
                    }
                }
                json!({ "card": card, "items": created, "errors": errors })
            }
            CardError::ItemSyncRejected(rejections) => {
                let errors: BTreeMap<String, &FieldErrors> = rejections
                    .iter()
                    .map(|(index, fields)| (index.to_string(), fields))
                    .collect();
                json!({ "errors": errors })
            }
            CardError::ArtifactFailed { card_id, .. } => json!({ "card_id": card_id }),
            _ => json!({}),
        };
        CardResponse::new(self.status(), &message, data)
    }
}
