//! Durable string-keyed store interface.

use async_trait::async_trait;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "sqlite")]
    #[error("Query build error: {0}")]
    Query(#[from] sea_query::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown storage type: {0}")]
    UnknownType(String),
}

/// Interface for raw string persistence.
///
/// Values are opaque strings; encoding is the caller's concern
/// (see `storage::Storage` for the typed facade).
///
/// Implementations:
/// - `MemoryKeyValueStore`: in-process map, used in tests
/// - `SqliteKeyValueStore`: durable on-device store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys return `None`, not an error.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Delete every value.
    async fn clear(&self) -> Result<()>;
}
