mod traits;

pub use traits::{SqlxSchema, SqlxCrud, is_unique_violation};

/// Initializes the database connection pool for the application.
///
/// Single point of entry for database setup: creates a process-wide pool and
/// ensures that tables for the registered types exist, in declaration order
/// (parents before children so foreign keys resolve).
///
/// # Generated Functions
/// - `async fn connect(drop_tables: bool, create_tables: bool) -> &'static PgPool`
///
/// # Example
/// ```rust,ignore
/// init_database!([Card, CardItem, CardImage]);
///
/// #[tokio::main]
/// async fn main() {
///     let pool = connect(false, true).await;
///     // ... use pool
/// }
/// ```
#[macro_export]
macro_rules! init_database {
    ([$($db_type:ty),* $(,)?]) => {
        static POOL: tokio::sync::OnceCell<sqlx::PgPool> = tokio::sync::OnceCell::const_new();

        async fn connect(drop_tables: bool, create_tables: bool) -> &'static sqlx::PgPool {
            POOL.get_or_init(|| async {
                let database_url = std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL environment variable not set");

                let pool = sqlx::PgPool::connect(&database_url).await
                    .expect("Failed to connect to database");

                if drop_tables {
                    $(
                        let drop_sql = <$db_type as $crate::SqlxSchema>::drop_table_sql();
                        sqlx::query(&drop_sql).execute(&pool).await
                            .unwrap_or_else(|e| {
                                tracing::warn!("Failed to drop table for '{}': {:?}", stringify!($db_type), e);
                                sqlx::postgres::PgQueryResult::default()
                            });
                    )*
                }

                if create_tables {
                    $(
                        let create_sql = <$db_type as $crate::SqlxSchema>::create_table_sql();
                        sqlx::query(&create_sql).execute(&pool).await
                            .unwrap_or_else(|e| panic!("Failed to create table for '{}'. Error: {:?}", stringify!($db_type), e));
                    )*
                }

                pool
            }).await
        }
    };
}
