use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::{postgres::PgArguments, Postgres};

use linkcard_common::get_current_timestamp;
use linkcard_database::{SqlxCrud, SqlxSchema};

/// A card's child item. Positions form a dense 1..N sequence per card in
/// display order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardItem {
    pub id: Uuid,
    pub card_id: Uuid,

    pub item_type: String,
    pub value: String,
    pub label: Option<String>,
    pub position: i32,

    pub created_at: i64,
    pub updated_at: i64,
}

impl CardItem {
    pub fn new(card_id: Uuid, item_type: &str, value: &str, label: Option<String>, position: i32) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            card_id,
            item_type: item_type.to_string(),
            value: value.to_string(),
            label,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// All items of a card, in display order.
    pub async fn find_by_card<'e, E>(card_id: &Uuid, executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_as(
            "SELECT id, card_id, item_type, value, label, position, created_at, updated_at \
             FROM card_items WHERE card_id = $1 ORDER BY position",
        )
        .bind(card_id)
        .fetch_all(executor)
        .await
    }
}

impl SqlxSchema for CardItem {
    type Id = Uuid;
    type Row = CardItem;

    const TABLE_NAME: &'static str = "card_items";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id", "card_id", "item_type", "value", "label", "position",
        "created_at", "updated_at",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS card_items (
            id UUID PRIMARY KEY,
            card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            item_type TEXT NOT NULL,
            value TEXT NOT NULL,
            label TEXT,
            position INT NOT NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )
        "#
        .to_string()
    }

    fn from_row(row: CardItem) -> Self {
        row
    }
}

impl SqlxCrud for CardItem {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.card_id)
            .bind(self.item_type.clone())
            .bind(self.value.clone())
            .bind(self.label.clone())
            .bind(self.position)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.card_id)
            .bind(self.item_type.clone())
            .bind(self.value.clone())
            .bind(self.label.clone())
            .bind(self.position)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}
