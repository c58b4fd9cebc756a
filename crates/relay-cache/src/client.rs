//! Cache client contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheResult;

/// A cache view bound to one namespace.
///
/// Implementations must tolerate concurrent `get`/`set` calls from many
/// invocations of the same plugin.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Namespace this client reads and writes.
    fn namespace(&self) -> &str;

    /// Look up a stored value.
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &Value) -> CacheResult<()>;
}

/// Storage backend that hands out namespaced clients.
pub trait CacheBackend: Send + Sync {
    /// Open a client for `namespace`.
    fn open(&self, namespace: &str) -> CacheResult<Arc<dyn CacheClient>>;
}
