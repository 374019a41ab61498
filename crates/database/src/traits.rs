use sqlx::{FromRow, Postgres, Error as SqlxError, postgres::PgArguments, Acquire};
use async_trait::async_trait;

/// Trait to define the schema of a database object for PostgreSQL.
pub trait SqlxSchema {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + Clone + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>;

    /// The intermediate type that implements FromRow, used for fetching from the database.
    type Row: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin;

    /// The name of the database table.
    const TABLE_NAME: &'static str;
    /// The name of the primary key column.
    const ID_COLUMN_NAME: &'static str;
    /// A list of all column names in the table.
    const COLUMNS: &'static [&'static str];

    fn id_column_name() -> &'static str { Self::ID_COLUMN_NAME }
    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn columns() -> &'static [&'static str] { Self::COLUMNS }

    /// Generates the SQL query string for selecting all records.
    fn select_all_sql() -> String {
        format!("SELECT {} FROM {}", Self::COLUMNS.join(", "), Self::TABLE_NAME)
    }
    /// Generates the SQL query string for selecting a record by its primary key.
    fn select_by_id_sql() -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Self::COLUMNS.join(", "), Self::TABLE_NAME, Self::ID_COLUMN_NAME
        )
    }
    /// Generates the SQL query string for inserting a new record.
    /// Uses RETURNING so the caller gets the inserted row back.
    fn insert_sql() -> String {
        let placeholders = (1..=Self::COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            Self::TABLE_NAME, Self::COLUMNS.join(", "), placeholders, Self::COLUMNS.join(", ")
        )
    }
    /// Generates the SQL query string for updating an existing record by its primary key.
    fn update_by_id_sql() -> String {
        let assignments = Self::COLUMNS.iter()
            .filter(|c| **c != Self::ID_COLUMN_NAME)
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            Self::TABLE_NAME, assignments, Self::ID_COLUMN_NAME,
            Self::COLUMNS.len(), Self::COLUMNS.join(", ")
        )
    }
    /// Generates the SQL query string for deleting a record by its primary key.
    fn delete_by_id_sql() -> String {
        format!("DELETE FROM {} WHERE {} = $1", Self::TABLE_NAME, Self::ID_COLUMN_NAME)
    }

    /// Retrieves the value of the primary key for an instance of the object.
    fn get_id_value(&self) -> Self::Id;

    /// Generates the SQL query string for creating the table.
    fn create_table_sql() -> String;

    /// Generates the SQL query string for dropping the table.
    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", Self::TABLE_NAME)
    }

    /// Converts the intermediate Row type to the Self type.
    fn from_row(row: Self::Row) -> Self;
}

/// Trait for CRUD (Create, Read, Update, Delete) operations for PostgreSQL.
#[async_trait]
pub trait SqlxCrud: SqlxSchema + Sized + Send + Sync + Unpin + Clone {
    /// Binds the struct fields to an insert query, in COLUMNS order.
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Binds the struct fields to an update query.
    /// The ID is bound last for the WHERE clause.
    fn bind_update<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Creates a new record in the database.
    async fn create<'e, A>(self, acquirer: A) -> Result<Self, SqlxError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        let sql = Self::insert_sql();
        let query_with_bindings = self.bind_insert(sqlx::query_as(&sql));
        query_with_bindings.fetch_one(&mut *conn).await.map(Self::from_row)
    }

    /// Creates a new record on an open transaction's connection.
    ///
    /// The generic form cannot be used there: instantiating the boxed future
    /// through a reborrowed `&mut PgConnection` trips rustc's
    /// "implementation of `Acquire` is not general enough" check and the
    /// future stops being `Send`.
    async fn create_in_tx(self, conn: &mut sqlx::PgConnection) -> Result<Self, SqlxError> {
        let sql = Self::insert_sql();
        let query_with_bindings = self.bind_insert(sqlx::query_as(&sql));
        query_with_bindings.fetch_one(conn).await.map(Self::from_row)
    }

    /// Finds a record by its primary key.
    async fn find_by_id<'e, A>(id: Self::Id, acquirer: A) -> Result<Option<Self>, SqlxError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        let sql = Self::select_by_id_sql();
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map(|opt_row| opt_row.map(Self::from_row))
    }

    /// Updates an existing record in the database.
    async fn update<'e, A>(self, acquirer: A) -> Result<Self, SqlxError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        let sql = Self::update_by_id_sql();
        let query_with_bindings = self.bind_update(sqlx::query_as(&sql));
        query_with_bindings.fetch_one(&mut *conn).await.map(Self::from_row)
    }

    /// Updates an existing record on an open transaction's connection. See
    /// [`SqlxCrud::create_in_tx`] for why the generic form does not work
    /// there.
    async fn update_in_tx(self, conn: &mut sqlx::PgConnection) -> Result<Self, SqlxError> {
        let sql = Self::update_by_id_sql();
        let query_with_bindings = self.bind_update(sqlx::query_as(&sql));
        query_with_bindings.fetch_one(conn).await.map(Self::from_row)
    }

    /// Deletes a record from the database by its primary key.
    async fn delete<'e, A>(self, acquirer: A) -> Result<u64, SqlxError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = acquirer.acquire().await?;
        let sql = Self::delete_by_id_sql();
        sqlx::query(&sql)
            .bind(self.get_id_value())
            .execute(&mut *conn)
            .await
            .map(|result| result.rows_affected())
    }
}

/// Returns true when the error is a Postgres unique-constraint violation
/// (SQLSTATE 23505). Used to retry slug generation on collision.
pub fn is_unique_violation(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Uuid;

    #[derive(Debug, Clone, sqlx::FromRow)]
    struct WidgetRow {
        id: Uuid,
        name: String,
    }

    #[derive(Debug, Clone)]
    struct Widget {
        id: Uuid,
        name: String,
    }

    impl SqlxSchema for Widget {
        type Id = Uuid;
        type Row = WidgetRow;

        const TABLE_NAME: &'static str = "widgets";
        const ID_COLUMN_NAME: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id", "name"];

        fn get_id_value(&self) -> Uuid { self.id }
        fn create_table_sql() -> String {
            "CREATE TABLE IF NOT EXISTS widgets (id UUID PRIMARY KEY, name TEXT NOT NULL)".to_string()
        }
        fn from_row(row: WidgetRow) -> Self {
            Self { id: row.id, name: row.name }
        }
    }

    #[test]
    fn select_sql_lists_all_columns() {
        assert_eq!(Widget::select_all_sql(), "SELECT id, name FROM widgets");
        assert_eq!(Widget::select_by_id_sql(), "SELECT id, name FROM widgets WHERE id = $1");
    }

    #[test]
    fn insert_sql_returns_inserted_row() {
        assert_eq!(
            Widget::insert_sql(),
            "INSERT INTO widgets (id, name) VALUES ($1, $2) RETURNING id, name"
        );
    }

    #[test]
    fn update_sql_binds_id_last() {
        assert_eq!(
            Widget::update_by_id_sql(),
            "UPDATE widgets SET name = $1 WHERE id = $2 RETURNING id, name"
        );
    }

    #[test]
    fn row_converts_to_model() {
        let widget = Widget::from_row(WidgetRow { id: Uuid::nil(), name: "w".into() });
        assert_eq!(widget.name, "w");
    }
}
