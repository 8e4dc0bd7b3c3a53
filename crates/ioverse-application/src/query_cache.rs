use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use ioverse_core::Result;

/// Cache key of the conversation list.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// One cached query result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    /// Set by [`QueryCache::invalidate`]; the next reader should refetch.
    pub stale: bool,
}

/// Shared client-side cache of query results keyed by logical name.
///
/// Values are stored as JSON so any serde type can be cached. Cloning the
/// cache yields another handle to the same storage.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cached value for `key`, decoded as `T`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if nothing is cached under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value.clone())?)),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stale: false,
            },
        );
        Ok(())
    }

    /// Applies `f` to the cached value under one write lock.
    ///
    /// # Returns
    ///
    /// `Ok(false)` without calling `f` if nothing is cached under `key`.
    pub async fn update<T, F>(&self, key: &str, f: F) -> Result<bool>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };

        let mut value: T = serde_json::from_value(entry.value.clone())?;
        f(&mut value);
        entry.value = serde_json::to_value(&value)?;
        Ok(true)
    }

    /// Returns a copy of the raw entry, staleness included.
    pub async fn snapshot(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Marks the entry stale. The value stays readable until refetched.
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.stale = true;
        }
    }

    /// Returns true when the entry is missing or was invalidated.
    pub async fn needs_refetch(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_none_or(|entry| entry.stale)
    }

    pub async fn remove(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}
