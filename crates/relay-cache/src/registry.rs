//! Lazy per-namespace client registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::{CacheBackend, CacheClient};
use crate::error::{CacheError, CacheResult};

/// Hands out one shared client per namespace, opening it on first use.
pub struct CacheRegistry {
    backend: Arc<dyn CacheBackend>,
    clients: Mutex<HashMap<String, Arc<dyn CacheClient>>>,
}

impl CacheRegistry {
    /// Create a registry over the given backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the client for `namespace`, opening it if this is the first request.
    pub fn client(&self, namespace: &str) -> CacheResult<Arc<dyn CacheClient>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| CacheError::Backend("cache registry lock poisoned".to_string()))?;

        if let Some(client) = clients.get(namespace) {
            return Ok(Arc::clone(client));
        }

        let client = self.backend.open(namespace)?;
        tracing::debug!(namespace, "opened cache client");
        clients.insert(namespace.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of namespaces opened so far.
    pub fn open_count(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }
}
