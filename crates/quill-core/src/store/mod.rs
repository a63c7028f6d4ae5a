//! Persisted cache store and the key-value storage seam.
//!
//! The host provides a scoped, durable key-value API; the engine only ever
//! touches it through the [`KeyValueStore`] trait so tests (and other hosts)
//! can substitute their own implementation.

mod cache;
mod preferences;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

pub use cache::CacheStore;
pub use preferences::PreferencesStore;

/// Scoped durable key-value storage collaborator.
///
/// Assumed durable across process suspension. Implementations return
/// `Error::CacheUnavailable` when the backing store cannot be reached.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory `KeyValueStore`, the reference implementation used by tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| crate::Error::CacheUnavailable("storage mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| crate::Error::CacheUnavailable("storage mutex poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| crate::Error::CacheUnavailable("storage mutex poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
