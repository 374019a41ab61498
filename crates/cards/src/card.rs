use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::{postgres::PgArguments, Postgres};

use linkcard_common::get_current_timestamp;
use linkcard_database::{SqlxCrud, SqlxSchema};

/// The card row. Items and images live in their own tables; together they
/// form the card aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,

    pub name: String,
    /// Globally unique, URL-safe, assigned once at creation.
    pub slug: String,
    /// Normalized accent color, e.g. `#1D4ED8`.
    pub color: String,
    pub theme: String,

    pub qr_target_url: Option<String>,
    pub qr_image_url: Option<String>,
    pub qr_image_path: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Card {
    pub fn new(owner_id: Uuid, name: &str, slug: &str, color: &str, theme: &str) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            slug: slug.to_string(),
            color: color.to_string(),
            theme: theme.to_string(),
            qr_target_url: None,
            qr_image_url: None,
            qr_image_path: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SqlxSchema for Card {
    type Id = Uuid;
    type Row = Card;

    const TABLE_NAME: &'static str = "cards";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id", "owner_id", "name", "slug", "color", "theme",
        "qr_target_url", "qr_image_url", "qr_image_path",
        "created_at", "updated_at",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL,
            theme TEXT NOT NULL,
            qr_target_url TEXT,
            qr_image_url TEXT,
            qr_image_path TEXT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )
        "#
        .to_string()
    }

    fn from_row(row: Card) -> Self {
        row
    }
}

impl SqlxCrud for Card {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.owner_id)
            .bind(self.name.clone())
            .bind(self.slug.clone())
            .bind(self.color.clone())
            .bind(self.theme.clone())
            .bind(self.qr_target_url.clone())
            .bind(self.qr_image_url.clone())
            .bind(self.qr_image_path.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.owner_id)
            .bind(self.name.clone())
            .bind(self.slug.clone())
            .bind(self.color.clone())
            .bind(self.theme.clone())
            .bind(self.qr_target_url.clone())
            .bind(self.qr_image_url.clone())
            .bind(self.qr_image_path.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}
