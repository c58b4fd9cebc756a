//! In-memory cache backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{CacheBackend, CacheClient};
use crate::error::{CacheError, CacheResult};

/// Counters shared by every client of one [`MemoryBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of `get` calls
    pub gets: u64,
    /// Number of `get` calls that found a value
    pub hits: u64,
    /// Number of `set` calls
    pub sets: u64,
}

#[derive(Default)]
struct Store {
    entries: Mutex<HashMap<String, HashMap<String, Value>>>,
    gets: AtomicU64,
    hits: AtomicU64,
    sets: AtomicU64,
}

impl Store {
    fn entries(&self) -> CacheResult<MutexGuard<'_, HashMap<String, HashMap<String, Value>>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("memory cache lock poisoned".to_string()))
    }
}

/// Process-local backend. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Store>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the access counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            gets: self.store.gets.load(Ordering::SeqCst),
            hits: self.store.hits.load(Ordering::SeqCst),
            sets: self.store.sets.load(Ordering::SeqCst),
        }
    }

    /// Number of entries stored under `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        self.store
            .entries()
            .map(|e| e.get(namespace).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Read an entry without touching the counters.
    pub fn peek(&self, namespace: &str, key: &str) -> Option<Value> {
        let entries = self.store.entries().ok()?;
        entries.get(namespace)?.get(key).cloned()
    }

    /// Seed an entry without touching the counters.
    pub fn insert(&self, namespace: &str, key: &str, value: Value) {
        if let Ok(mut entries) = self.store.entries() {
            entries
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), value);
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn open(&self, namespace: &str) -> CacheResult<Arc<dyn CacheClient>> {
        crate::validate_namespace(namespace)?;
        Ok(Arc::new(MemoryCache {
            namespace: namespace.to_string(),
            store: Arc::clone(&self.store),
        }))
    }
}

/// Client view of a [`MemoryBackend`] namespace.
pub struct MemoryCache {
    namespace: String,
    store: Arc<Store>,
}

#[async_trait]
impl CacheClient for MemoryCache {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        self.store.gets.fetch_add(1, Ordering::SeqCst);
        let value = self
            .store
            .entries()?
            .get(&self.namespace)
            .and_then(|ns| ns.get(key))
            .cloned();
        if value.is_some() {
            self.store.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &Value) -> CacheResult<()> {
        self.store.sets.fetch_add(1, Ordering::SeqCst);
        self.store
            .entries()?
            .entry(self.namespace.clone())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}
