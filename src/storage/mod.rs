//! Storage implementations and the typed storage facade.
//!
//! Backends implement [`KeyValueStore`] over raw strings. [`Storage`] layers
//! the encoding policy on top: structured values go through JSON, secrets are
//! stored verbatim so they can be used directly as header values. Every
//! failing operation is reported to the optional diagnostic sink with the
//! operation kind and key; secret values are masked before reporting.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{DiagnosticEvent, DiagnosticSink};

pub use crate::interfaces::key_value_store::Result;
pub use crate::interfaces::{KeyValueStore, StorageError};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryKeyValueStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKeyValueStore;

/// Key holding the newest-first location history.
pub const LOCATION_HISTORY_KEY: &str = "locationHistory";
/// Key holding records whose remote delivery failed.
pub const FAILED_LOCATIONS_KEY: &str = "failedLocations";
/// Key holding the bearer token (stored as a raw secret).
pub const AUTH_TOKEN_KEY: &str = "userToken";
/// Key holding error reports that could not be sent.
pub const FAILED_ERRORS_KEY: &str = "failedErrors";

/// Replacement for secret values in diagnostics and logs.
pub const SECRET_MASK: &str = "********";

/// Kind of storage operation, as reported to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    Set,
    Get,
    Remove,
    Clear,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOperation::Set => write!(f, "SET"),
            StorageOperation::Get => write!(f, "GET"),
            StorageOperation::Remove => write!(f, "REMOVE"),
            StorageOperation::Clear => write!(f, "CLEAR"),
        }
    }
}

/// Typed facade over a [`KeyValueStore`].
///
/// Cheap to clone; clones share the backend and diagnostic sink.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            diagnostics: None,
        }
    }

    /// Report failing operations to `sink`.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// JSON-encode `value` and store it under `key`.
    pub async fn set_json<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                let error = StorageError::from(e);
                self.report_failure(StorageOperation::Set, key, None, &error)
                    .await;
                return Err(error);
            }
        };

        if let Err(error) = self.backend.set_item(key, &encoded).await {
            let reported = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            self.report_failure(StorageOperation::Set, key, Some(reported), &error)
                .await;
            return Err(error);
        }
        Ok(())
    }

    /// Read and JSON-decode the value under `key`. Missing or empty values are `None`.
    pub async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let raw = match self.backend.get_item(key).await {
            Ok(raw) => raw,
            Err(error) => {
                self.report_failure(StorageOperation::Get, key, None, &error)
                    .await;
                return Err(error);
            }
        };

        match raw {
            Some(raw) if !raw.is_empty() => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    let error = StorageError::from(e);
                    self.report_failure(StorageOperation::Get, key, None, &error)
                        .await;
                    Err(error)
                }
            },
            _ => Ok(None),
        }
    }

    /// Store a secret verbatim, without JSON encoding.
    pub async fn set_secret(&self, key: &str, secret: &str) -> Result<()> {
        if let Err(error) = self.backend.set_item(key, secret).await {
            self.report_failure(StorageOperation::Set, key, Some(json!(SECRET_MASK)), &error)
                .await;
            return Err(error);
        }
        Ok(())
    }

    /// Read a secret stored with [`Storage::set_secret`].
    pub async fn get_secret(&self, key: &str) -> Result<Option<String>> {
        match self.backend.get_item(key).await {
            Ok(secret) => Ok(secret.filter(|s| !s.is_empty())),
            Err(error) => {
                self.report_failure(StorageOperation::Get, key, None, &error)
                    .await;
                Err(error)
            }
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        if let Err(error) = self.backend.remove_item(key).await {
            self.report_failure(StorageOperation::Remove, key, None, &error)
                .await;
            return Err(error);
        }
        Ok(())
    }

    /// Delete everything in the backing store.
    pub async fn clear_all(&self) -> Result<()> {
        if let Err(error) = self.backend.clear().await {
            self.report_failure(StorageOperation::Clear, "*", None, &error)
                .await;
            return Err(error);
        }
        info!("Local storage cleared");
        Ok(())
    }

    async fn report_failure(
        &self,
        operation: StorageOperation,
        key: &str,
        value: Option<serde_json::Value>,
        error: &StorageError,
    ) {
        warn!(operation = %operation, key = %key, error = %error, "Storage operation failed");

        let Some(sink) = &self.diagnostics else {
            return;
        };

        let mut context = json!({ "key": key });
        if let Some(value) = value {
            context["value"] = value;
        }
        sink.report(DiagnosticEvent::new(operation.to_string(), error, context))
            .await;
    }
}

/// Initialize the key-value backend based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    info!("Storage: {} at {}", config.storage_type, config.path);

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let store = SqliteKeyValueStore::open(&config.path).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::UnknownType(config.storage_type.to_string()))
        }
    }
}
