use std::collections::HashSet;

use serde::Serialize;
use sqlx::types::Uuid;
use sqlx::{PgPool, Postgres, Transaction};

use linkcard_common::get_current_timestamp;
use linkcard_database::SqlxCrud;

use crate::error::FieldErrors;
use crate::input::ItemInput;
use crate::normalize::MAX_ITEM_VALUE_LEN;
use crate::CardItem;

/// Closed set of accepted item types. Only `name` is implemented; anything
/// else is rejected with a field error.
const ACCEPTED_ITEM_TYPES: &[&str] = &["name"];

/// Per-input-index result of a create pass. Index correlation lets callers
/// map errors back to client-submitted items, which may lack a server id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ItemOutcome {
    Created(CardItem),
    Rejected(FieldErrors),
}

impl ItemOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ItemOutcome::Rejected(_))
    }
}

#[derive(Debug)]
pub enum SyncError {
    /// At least one submitted item failed validation; indexed by submission
    /// order. The caller rolls back its transaction.
    Rejected(Vec<(usize, FieldErrors)>),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Database(err)
    }
}

/// Validates one submitted item against its type's rule set. An empty map
/// means the item is valid.
pub fn validate_item(input: &ItemInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !ACCEPTED_ITEM_TYPES.contains(&input.item_type.as_str()) {
        errors.insert(
            "type".to_string(),
            format!("unsupported item type '{}'", input.item_type),
        );
    }
    if input.value.trim().is_empty() {
        errors.insert("value".to_string(), "value is required".to_string());
    } else if input.value.chars().count() > MAX_ITEM_VALUE_LEN {
        errors.insert(
            "value".to_string(),
            format!("value must be at most {} characters", MAX_ITEM_VALUE_LEN),
        );
    }
    errors
}

/// Per-index validation for a full sync submission. On top of the per-item
/// rules, a repeated id is rejected at its later index: two entries mapping
/// to one row would collapse the submission below N rows and break the
/// dense-position invariant.
fn validate_sync_inputs(inputs: &[ItemInput]) -> Vec<(usize, FieldErrors)> {
    let mut seen_ids = HashSet::new();
    let mut rejections = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        let mut errors = validate_item(input);
        if let Some(id) = input.id {
            if !seen_ids.insert(id) {
                errors.insert("id".to_string(), format!("duplicate item id '{}'", id));
            }
        }
        if !errors.is_empty() {
            rejections.push((index, errors));
        }
    }
    rejections
}

/// The diff between a card's existing items and a submission: which existing
/// rows die, and per submitted index whether it updates a row or inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub deletes: Vec<Uuid>,
    /// One entry per submitted index: `Some(id)` updates that existing row,
    /// `None` inserts a fresh one. Positions are the index + 1, so surviving
    /// items always renumber to a dense 1..N sequence in submission order.
    pub matches: Vec<Option<Uuid>>,
}

pub fn plan_sync(existing: &[Uuid], submitted: &[Option<Uuid>]) -> SyncPlan {
    let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
    let submitted_set: HashSet<Uuid> = submitted.iter().flatten().copied().collect();

    let deletes = existing
        .iter()
        .filter(|id| !submitted_set.contains(id))
        .copied()
        .collect();

    // ids the card never owned are treated as inserts, not updates
    let matches = submitted
        .iter()
        .map(|id| id.filter(|id| existing_set.contains(id)))
        .collect();

    SyncPlan { deletes, matches }
}

/// Creates, updates, deletes, and reorders a card's child items.
pub struct ItemSynchronizer;

impl ItemSynchronizer {
    /// Create-path pass over a fresh card's submitted items. Valid items are
    /// persisted with dense positions; invalid ones become `Rejected`
    /// outcomes at their original index. The caller decides whether any
    /// rejection compensates the whole card.
    pub async fn create_all(
        card_id: &Uuid,
        inputs: &[ItemInput],
        pool: &PgPool,
    ) -> Result<Vec<ItemOutcome>, sqlx::Error> {
        let mut outcomes = Vec::with_capacity(inputs.len());
        let mut position = 0i32;

        for input in inputs {
            let errors = validate_item(input);
            if !errors.is_empty() {
                outcomes.push(ItemOutcome::Rejected(errors));
                continue;
            }
            position += 1;
            let item = CardItem::new(
                *card_id,
                &input.item_type,
                &input.value,
                input.label.clone(),
                position,
            );
            outcomes.push(ItemOutcome::Created(item.create(pool).await?));
        }

        Ok(outcomes)
    }

    /// Update-path diff sync, entirely inside the caller's transaction.
    /// Validation failures abort before any row is touched; the caller rolls
    /// the transaction back.
    pub async fn sync(
        card_id: &Uuid,
        inputs: &[ItemInput],
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<CardItem>, SyncError> {
        let rejections = validate_sync_inputs(inputs);
        if !rejections.is_empty() {
            return Err(SyncError::Rejected(rejections));
        }

        let existing = CardItem::find_by_card(card_id, &mut **tx).await?;
        let existing_ids: Vec<Uuid> = existing.iter().map(|item| item.id).collect();
        let submitted_ids: Vec<Option<Uuid>> = inputs.iter().map(|input| input.id).collect();
        let plan = plan_sync(&existing_ids, &submitted_ids);

        for id in &plan.deletes {
            sqlx::query("DELETE FROM card_items WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }

        let now = get_current_timestamp();
        let mut synced = Vec::with_capacity(inputs.len());
        for (index, (input, matched)) in inputs.iter().zip(&plan.matches).enumerate() {
            let position = index as i32 + 1;
            let item = match matched {
                Some(id) => {
                    let mut item = existing
                        .iter()
                        .find(|item| item.id == *id)
                        .cloned()
                        .expect("plan only matches existing ids");
                    item.item_type = input.item_type.clone();
                    item.value = input.value.clone();
                    item.label = input.label.clone();
                    item.position = position;
                    item.updated_at = now;
                    item.update_in_tx(&mut **tx).await?
                }
                None => {
                    let item = CardItem::new(
                        *card_id,
                        &input.item_type,
                        &input.value,
                        input.label.clone(),
                        position,
                    );
                    item.create_in_tx(&mut **tx).await?
                }
            };
            synced.push(item);
        }

        Ok(synced)
    }
}
