//! SQLite KeyValueStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::schema::{KeyValues, CREATE_KEY_VALUES_TABLE};
use super::{KeyValueStore, Result};

/// SQLite implementation of KeyValueStore.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new SQLite key-value store on an existing pool.
    ///
    /// Call [`SqliteKeyValueStore::init`] before first use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path` and initialize the schema.
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Initialize the key-value table schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_KEY_VALUES_TABLE)
            .execute(&self.pool)
            .await?;
        info!("Key-value table initialized (SQLite)");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let query = Query::select()
            .column(KeyValues::Value)
            .from(KeyValues::Table)
            .and_where(Expr::col(KeyValues::Key).eq(key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        Ok(row.map(|row| row.get::<String, _>("item_value")))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        let query = Query::insert()
            .into_table(KeyValues::Table)
            .columns([KeyValues::Key, KeyValues::Value, KeyValues::UpdatedAt])
            .values([key.into(), value.into(), updated_at.into()])?
            .on_conflict(
                OnConflict::column(KeyValues::Key)
                    .update_columns([KeyValues::Value, KeyValues::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        debug!(key = %key, "Stored value");

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let query = Query::delete()
            .from_table(KeyValues::Table)
            .and_where(Expr::col(KeyValues::Key).eq(key))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let query = Query::delete()
            .from_table(KeyValues::Table)
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}
