use serde_json::json;
use sqlx::types::Uuid;
use sqlx::PgPool;

use linkcard_assets::{
    ImageAssetStore, ImageKind, QrCodeGenerator, StoredImage,
};
use linkcard_common::get_current_timestamp;
use linkcard_database::{is_unique_violation, SqlxCrud};
use linkcard_themes::{CardContext, ItemContext, ThemeCatalog, DEFAULT_ACCENT_COLOR};

use crate::card::Card;
use crate::card_image::CardImage;
use crate::card_item::CardItem;
use crate::error::{CardError, FieldErrors};
use crate::input::CardInput;
use crate::items::{ItemOutcome, ItemSynchronizer, SyncError};
use crate::normalize::{
    normalize_color, normalize_theme, slug_with_suffix, slugify, validate_name,
};
use crate::response::CardResponse;
use crate::saga::{CreateSaga, CreateStage};

const MAX_SLUG_ATTEMPTS: usize = 4;

/// A fully loaded card: the row plus its items and image rows.
#[derive(Debug, Clone)]
pub struct CardAggregate {
    pub card: Card,
    pub items: Vec<CardItem>,
    pub images: Vec<CardImage>,
}

impl CardAggregate {
    pub fn theme(&self) -> &str {
        &self.card.theme
    }

    fn image_url(&self, kind: ImageKind) -> Option<String> {
        self.images
            .iter()
            .find(|image| image.kind == kind.as_str())
            .map(|image| image.image_url.clone())
    }

    /// Flattens the aggregate into the shape theme templates consume.
    pub fn render_context(&self) -> CardContext {
        let items = self
            .items
            .iter()
            .map(|item| ItemContext {
                item_type: item.item_type.clone(),
                label: item.label.clone(),
                value: item.value.clone(),
            })
            .collect();
        CardContext::normalized(
            Some(self.card.name.clone()),
            Some(self.card.color.clone()),
            self.image_url(ImageKind::Banner),
            self.image_url(ImageKind::Avatar),
            self.card.qr_image_url.clone(),
            items,
        )
    }
}

/// Orchestrates the card aggregate: the card row, its items, its stored
/// images, and its QR artifact, kept consistent across create, update,
/// delete, and QR regeneration.
pub struct CardAggregateService {
    pool: PgPool,
    images: ImageAssetStore,
    qr: QrCodeGenerator,
    catalog: ThemeCatalog,
    default_theme: Option<String>,
}

impl CardAggregateService {
    pub fn new(
        pool: PgPool,
        images: ImageAssetStore,
        qr: QrCodeGenerator,
        catalog: ThemeCatalog,
        default_theme: Option<String>,
    ) -> Self {
        Self {
            pool,
            images,
            qr,
            catalog,
            default_theme,
        }
    }

    pub fn catalog(&self) -> &ThemeCatalog {
        &self.catalog
    }

    /// Creates a card with its items, images, and QR artifact.
    ///
    /// Any item rejection compensates the already-inserted card row away, so
    /// a 422 from this path never leaves a half-built card behind. QR
    /// failure, by contrast, keeps the card: the artifact is regenerable.
    pub async fn create(
        &self,
        input: &CardInput,
        owner_id: &Uuid,
    ) -> Result<CardResponse, CardError> {
        let mut saga = CreateSaga::new();

        if let Err(message) = validate_name(&input.name) {
            let mut errors = FieldErrors::new();
            errors.insert("name".to_string(), message);
            return Err(CardError::Validation(errors));
        }
        let color = normalize_color(input.color.as_deref(), DEFAULT_ACCENT_COLOR);
        let theme = self
            .resolve_theme(input.theme.as_deref(), &[])
            .unwrap_or_else(|| "default".to_string());

        let card = self
            .insert_with_slug_retry(owner_id, &input.name, &color, &theme)
            .await?;
        saga.advance(CreateStage::RowCreated);

        saga.advance(CreateStage::ItemsPending);
        let outcomes = match ItemSynchronizer::create_all(&card.id, &input.items, &self.pool).await
        {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.compensate_create(&mut saga, &card).await;
                return Err(e.into());
            }
        };
        if outcomes.iter().any(ItemOutcome::is_rejected) {
            self.compensate_create(&mut saga, &card).await;
            return Err(CardError::ItemsRejected { card, outcomes });
        }
        saga.advance(CreateStage::ItemsOk);
        let items: Vec<CardItem> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Created(item) => Some(item),
                ItemOutcome::Rejected(_) => None,
            })
            .collect();

        saga.advance(CreateStage::ImagesPending);
        for (field, kind) in [
            (&input.banner, ImageKind::Banner),
            (&input.avatar, ImageKind::Avatar),
        ] {
            // the card row already exists, so the error must name it
            let stored = self
                .images
                .store_or_keep(field, &card.id, kind, &StoredImage::default())
                .await
                .map_err(|e| CardError::ArtifactFailed {
                    card_id: card.id,
                    source: e,
                })?;
            CardImage::reconcile(&card.id, kind, &stored, &self.pool).await?;
        }

        saga.advance(CreateStage::QrPending);
        let card = match self
            .qr
            .generate(&card.id, input.qr_logo.as_deref(), None)
            .await
        {
            Ok(artifact) => {
                let card = self.persist_qr(card, artifact).await?;
                saga.advance(CreateStage::Complete);
                card
            }
            Err(e) => {
                saga.advance(CreateStage::CompleteWithoutQr);
                tracing::error!(
                    "[CardAggregateService] qr generation failed for new card {}: {}",
                    card.id,
                    e
                );
                return Err(CardError::ArtifactFailed {
                    card_id: card.id,
                    source: e,
                });
            }
        };

        Ok(CardResponse::created(
            "card created",
            json!({ "card": card, "items": items }),
        ))
    }

    /// Replaces the card's fields and item list. The row update and the item
    /// sync share one transaction, so an item rejection rolls everything
    /// back and the stored card is untouched. Images are applied only after
    /// the commit succeeded.
    pub async fn update(
        &self,
        card_id: &Uuid,
        input: &CardInput,
        owner_id: &Uuid,
    ) -> Result<CardResponse, CardError> {
        let mut card = self.authorize(card_id, owner_id).await?;

        if let Err(message) = validate_name(&input.name) {
            let mut errors = FieldErrors::new();
            errors.insert("name".to_string(), message);
            return Err(CardError::Validation(errors));
        }
        // invalid or missing values fall back to what the card already has
        let color = normalize_color(input.color.as_deref(), &card.color);
        let theme = self
            .resolve_theme(input.theme.as_deref(), &[&card.theme])
            .unwrap_or_else(|| card.theme.clone());

        let mut tx = self.pool.begin().await?;

        card.name = input.name.clone();
        card.color = color;
        card.theme = theme;
        card.updated_at = get_current_timestamp();
        let card = card.update_in_tx(&mut *tx).await?;

        let items = match ItemSynchronizer::sync(&card.id, &input.items, &mut tx).await {
            Ok(items) => items,
            Err(SyncError::Rejected(rejections)) => {
                tx.rollback().await?;
                return Err(CardError::ItemSyncRejected(rejections));
            }
            Err(SyncError::Database(e)) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        };

        tx.commit().await?;

        for (field, kind) in [
            (&input.banner, ImageKind::Banner),
            (&input.avatar, ImageKind::Avatar),
        ] {
            let existing = CardImage::find_by_kind(&card.id, kind, &self.pool)
                .await?
                .map(|row| row.as_stored())
                .unwrap_or_default();
            let stored = self
                .images
                .store_or_keep(field, &card.id, kind, &existing)
                .await?;
            CardImage::reconcile(&card.id, kind, &stored, &self.pool).await?;
        }

        Ok(CardResponse::ok(
            "card updated",
            json!({ "card": card, "items": items }),
        ))
    }

    /// Deletes the card, its rows (via cascade), and its files on disk.
    pub async fn delete(&self, card_id: &Uuid, owner_id: &Uuid) -> Result<CardResponse, CardError> {
        let card = self.authorize(card_id, owner_id).await?;

        for image in CardImage::find_by_card(&card.id, &self.pool).await? {
            self.images.remove_quietly(Some(&image.image_path)).await;
        }
        self.images
            .remove_quietly(card.qr_image_path.as_deref())
            .await;

        let id = card.id;
        card.delete(&self.pool).await?;

        Ok(CardResponse::ok("card deleted", json!({ "card_id": id })))
    }

    /// Regenerates the QR artifact in place, optionally with a new logo. The
    /// old PNG is removed only after the replacement exists.
    pub async fn regenerate_qr(
        &self,
        card_id: &Uuid,
        owner_id: &Uuid,
        logo: Option<&str>,
    ) -> Result<CardResponse, CardError> {
        let card = self.authorize(card_id, owner_id).await?;

        let artifact = self
            .qr
            .generate(&card.id, logo, card.qr_image_url.as_deref())
            .await
            .map_err(|e| CardError::ArtifactFailed {
                card_id: card.id,
                source: e,
            })?;
        let card = self.persist_qr(card, artifact).await?;

        Ok(CardResponse::ok("qr regenerated", json!({ "card": card })))
    }

    /// Loads the full aggregate for the public page. No ownership check:
    /// published cards are world-readable.
    pub async fn load_aggregate(
        &self,
        card_id: &Uuid,
    ) -> Result<Option<CardAggregate>, CardError> {
        let Some(card) = Card::find_by_id(*card_id, &self.pool).await? else {
            return Ok(None);
        };
        let items = CardItem::find_by_card(&card.id, &self.pool).await?;
        let images = CardImage::find_by_card(&card.id, &self.pool).await?;
        Ok(Some(CardAggregate { card, items, images }))
    }

    async fn authorize(&self, card_id: &Uuid, owner_id: &Uuid) -> Result<Card, CardError> {
        let card = Card::find_by_id(*card_id, &self.pool)
            .await?
            .ok_or(CardError::NotFound)?;
        if card.owner_id != *owner_id {
            return Err(CardError::Unauthorized);
        }
        Ok(card)
    }

    fn resolve_theme(&self, input: Option<&str>, extra: &[&str]) -> Option<String> {
        let mut fallbacks: Vec<&str> = extra.to_vec();
        if let Some(default) = self.default_theme.as_deref() {
            fallbacks.push(default);
        }
        normalize_theme(input, &fallbacks, &self.catalog)
    }

    async fn insert_with_slug_retry(
        &self,
        owner_id: &Uuid,
        name: &str,
        color: &str,
        theme: &str,
    ) -> Result<Card, CardError> {
        let base = slugify(name);
        let mut slug = base.clone();
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let card = Card::new(*owner_id, name, &slug, color, theme);
            match card.create(&self.pool).await {
                Ok(card) => return Ok(card),
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(
                        "[CardAggregateService] slug '{}' taken, retry {}",
                        slug,
                        attempt + 1
                    );
                    slug = slug_with_suffix(&base);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CardError::Conflict(format!(
            "could not allocate a unique slug for '{}'",
            base
        )))
    }

    async fn persist_qr(
        &self,
        mut card: Card,
        artifact: linkcard_assets::QrArtifact,
    ) -> Result<Card, CardError> {
        card.qr_target_url = Some(artifact.target_url);
        card.qr_image_url = Some(artifact.image_url);
        card.qr_image_path = Some(artifact.image_path);
        card.updated_at = get_current_timestamp();
        Ok(card.update(&self.pool).await?)
    }

    /// Undoes the card insert after a failed item stage. The cascade takes
    /// any rows the item pass already wrote.
    async fn compensate_create(&self, saga: &mut CreateSaga, card: &Card) {
        saga.advance(CreateStage::ItemsFailed);
        saga.advance(CreateStage::CompensatingDelete);
        if let Err(e) = card.clone().delete(&self.pool).await {
            tracing::error!(
                "[CardAggregateService] compensation delete failed for card {}: {}",
                card.id,
                e
            );
        }
        saga.advance(CreateStage::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkcard_assets::{ImageAssetStore, QrCodeGenerator, StorageConfig};

    fn require_send<T: Send>(_: T) {}

    // axum handlers need Send futures; this fails to compile if any
    // operation's future loses Send (e.g. through a generic executor call
    // on an open transaction)
    #[tokio::test]
    async fn operation_futures_are_send() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/cards").unwrap();
        let config = StorageConfig::new("http://localhost:8080/assets", "/tmp/linkcard");
        let service = CardAggregateService::new(
            pool,
            ImageAssetStore::new(config.clone()),
            QrCodeGenerator::new(config),
            linkcard_themes::ThemeCatalog::discover("/tmp/linkcard/themes"),
            None,
        );
        let input = CardInput::default();
        let id = Uuid::nil();

        require_send(service.create(&input, &id));
        require_send(service.update(&id, &input, &id));
        require_send(service.delete(&id, &id));
        require_send(service.regenerate_qr(&id, &id, None));
        require_send(service.load_aggregate(&id));
    }

    fn aggregate() -> CardAggregate {
        let card = Card::new(
            Uuid::new_v4(),
            "Jane Doe",
            "jane-doe",
            "#FF8800",
            "default",
        );
        let items = vec![
            CardItem::new(card.id, "name", "Jane Doe", Some("Name".into()), 1),
            CardItem::new(card.id, "name", "JD", None, 2),
        ];
        CardAggregate {
            card,
            items,
            images: Vec::new(),
        }
    }

    #[test]
    fn render_context_flattens_items_in_order() {
        let aggregate = aggregate();
        let context = aggregate.render_context();
        assert_eq!(context.name, "Jane Doe");
        assert_eq!(context.color, "#FF8800");
        assert_eq!(context.items.len(), 2);
        assert_eq!(context.items[0].value, "Jane Doe");
        assert_eq!(context.items[1].value, "JD");
        assert!(context.banner_url.is_none());
    }

    #[test]
    fn render_context_picks_image_urls_by_kind() {
        let mut aggregate = aggregate();
        let now = linkcard_common::get_current_timestamp();
        aggregate.images.push(CardImage {
            id: Uuid::new_v4(),
            card_id: aggregate.card.id,
            kind: "banner".to_string(),
            image_url: "http://localhost/assets/cards/x/banner.png".to_string(),
            image_path: "/tmp/banner.png".to_string(),
            created_at: now,
            updated_at: now,
        });
        let context = aggregate.render_context();
        assert_eq!(
            context.banner_url.as_deref(),
            Some("http://localhost/assets/cards/x/banner.png")
        );
        assert!(context.avatar_url.is_none());
    }
}


