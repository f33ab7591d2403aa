//! In-memory key-value store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, Result, StorageError};

/// Key-value store that keeps values in memory.
///
/// Supports fault injection per operation and counts calls, so tests can
/// assert which paths touched storage.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
    fail_on_get: RwLock<bool>,
    fail_on_set: RwLock<bool>,
    fail_on_remove: RwLock<bool>,
    fail_on_clear: RwLock<bool>,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    pub async fn set_fail_on_set(&self, fail: bool) {
        *self.fail_on_set.write().await = fail;
    }

    pub async fn set_fail_on_remove(&self, fail: bool) {
        *self.fail_on_remove.write().await = fail;
    }

    pub async fn set_fail_on_clear(&self, fail: bool) {
        *self.fail_on_clear.write().await = fail;
    }

    /// Number of `get_item` calls so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set_item` calls so far.
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Raw stored string, bypassing fault injection.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::Backend(format!("injected {} failure", operation))
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_get.read().await {
            return Err(injected("get"));
        }
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_set.read().await {
            return Err(injected("set"));
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        if *self.fail_on_remove.read().await {
            return Err(injected("remove"));
        }
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if *self.fail_on_clear.read().await {
            return Err(injected("clear"));
        }
        self.values.write().await.clear();
        Ok(())
    }
}
