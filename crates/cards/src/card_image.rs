use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::{postgres::PgArguments, Acquire, Postgres};

use linkcard_assets::{ImageKind, StoredImage};
use linkcard_common::get_current_timestamp;
use linkcard_database::{SqlxCrud, SqlxSchema};

/// Banner/avatar row for a card. At most one row per `(card_id, kind)`;
/// absence of a row means "no image set".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardImage {
    pub id: Uuid,
    pub card_id: Uuid,

    pub kind: String,
    pub image_url: String,
    pub image_path: String,

    pub created_at: i64,
    pub updated_at: i64,
}

impl CardImage {
    pub fn as_stored(&self) -> StoredImage {
        StoredImage::existing(Some(&self.image_url), Some(&self.image_path))
    }

    pub async fn find_by_card<'e, A>(card_id: &Uuid, acquirer: A) -> Result<Vec<Self>, sqlx::Error>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        sqlx::query_as(
            "SELECT id, card_id, kind, image_url, image_path, created_at, updated_at \
             FROM card_images WHERE card_id = $1 ORDER BY kind",
        )
        .bind(card_id)
        .fetch_all(&mut *conn)
        .await
    }

    pub async fn find_by_kind<'e, A>(
        card_id: &Uuid,
        kind: ImageKind,
        acquirer: A,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        sqlx::query_as(
            "SELECT id, card_id, kind, image_url, image_path, created_at, updated_at \
             FROM card_images WHERE card_id = $1 AND kind = $2",
        )
        .bind(card_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *conn)
        .await
    }

    /// Reconciles the `(card_id, kind)` row with the stored image state:
    /// upserts when a file exists, deletes the row when it does not.
    pub async fn reconcile<'e, A>(
        card_id: &Uuid,
        kind: ImageKind,
        stored: &StoredImage,
        acquirer: A,
    ) -> Result<(), sqlx::Error>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        match (&stored.url, &stored.path) {
            (Some(url), Some(path)) => {
                let now = get_current_timestamp();
                sqlx::query(
                    "INSERT INTO card_images (id, card_id, kind, image_url, image_path, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $6) \
                     ON CONFLICT (card_id, kind) DO UPDATE \
                     SET image_url = EXCLUDED.image_url, image_path = EXCLUDED.image_path, updated_at = EXCLUDED.updated_at",
                )
                .bind(Uuid::new_v4())
                .bind(card_id)
                .bind(kind.as_str())
                .bind(url)
                .bind(path)
                .bind(now)
                .execute(&mut *conn)
                .await?;
            }
            _ => {
                sqlx::query("DELETE FROM card_images WHERE card_id = $1 AND kind = $2")
                    .bind(card_id)
                    .bind(kind.as_str())
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }
}

impl SqlxSchema for CardImage {
    type Id = Uuid;
    type Row = CardImage;

    const TABLE_NAME: &'static str = "card_images";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id", "card_id", "kind", "image_url", "image_path",
        "created_at", "updated_at",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS card_images (
            id UUID PRIMARY KEY,
            card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            image_url TEXT NOT NULL,
            image_path TEXT NOT NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            UNIQUE (card_id, kind)
        )
        "#
        .to_string()
    }

    fn from_row(row: CardImage) -> Self {
        row
    }
}

impl SqlxCrud for CardImage {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.card_id)
            .bind(self.kind.clone())
            .bind(self.image_url.clone())
            .bind(self.image_path.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.card_id)
            .bind(self.kind.clone())
            .bind(self.image_url.clone())
            .bind(self.image_path.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}
