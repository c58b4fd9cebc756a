//! Master-side dedup registry and request handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use relay_protocol::ops::{names, ClaimRequest, ClaimResponse, PublishRequest, PublishResponse};
use relay_protocol::{ClusterRequest, ClusterResponse, WireError, PROTOCOL_VERSION};
use serde_json::Value;

use super::transport::RequestHandler;

/// Counters kept by a [`ClaimRegistry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimStats {
    pub claims: u64,
    pub hits: u64,
    pub published: u64,
    pub rejected: u64,
}

/// Values published by workers, keyed by dedup key.
///
/// A key resolves at most once per build: the first publish wins and later
/// publishes for the same key are ignored.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    resolved: Mutex<HashMap<String, Value>>,
    claims: AtomicU64,
    hits: AtomicU64,
    published: AtomicU64,
    rejected: AtomicU64,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Each write is a single insert, so a poisoned map is still consistent.
    fn resolved(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The value published under `key`, if any.
    pub fn claim(&self, key: &str) -> Option<Value> {
        self.claims.fetch_add(1, Ordering::Relaxed);
        let value = self.resolved().get(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Resolve `key`. Returns false when it was already resolved.
    pub fn publish(&self, key: &str, value: Value) -> bool {
        let accepted = {
            let mut resolved = self.resolved();
            if resolved.contains_key(key) {
                false
            } else {
                resolved.insert(key.to_string(), value);
                true
            }
        };
        let counter = if accepted { &self.published } else { &self.rejected };
        counter.fetch_add(1, Ordering::Relaxed);
        accepted
    }

    pub fn len(&self) -> usize {
        self.resolved().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ClaimStats {
        ClaimStats {
            claims: self.claims.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Serves `claim` and `publish` from workers.
#[derive(Debug, Default)]
pub struct MasterHub {
    registry: ClaimRegistry,
}

impl MasterHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ClaimRegistry {
        &self.registry
    }

    fn handle_claim(&self, request: &ClusterRequest) -> Result<serde_json::Value, WireError> {
        let claim: ClaimRequest = request.decode_payload()?;
        let response = match self.registry.claim(&claim.key) {
            Some(value) => {
                tracing::debug!(key = %claim.key, file = %claim.file_path, "claim resolved");
                ClaimResponse::resolved(value)
            }
            None => ClaimResponse::unresolved(),
        };
        encode(response)
    }

    fn handle_publish(&self, request: &ClusterRequest) -> Result<serde_json::Value, WireError> {
        let publish: PublishRequest = request.decode_payload()?;
        let accepted = self.registry.publish(&publish.key, publish.value);
        if !accepted {
            tracing::debug!(
                key = %publish.key,
                file = %publish.file_path,
                "publish ignored, key already resolved"
            );
        }
        encode(PublishResponse { accepted })
    }
}

fn encode<T: serde::Serialize>(response: T) -> Result<serde_json::Value, WireError> {
    serde_json::to_value(response)
        .map_err(|e| WireError::invalid_request(format!("unserializable response: {}", e)))
}

#[async_trait]
impl RequestHandler for MasterHub {
    async fn handle(&self, request: ClusterRequest) -> ClusterResponse {
        if request.protocol_version != PROTOCOL_VERSION {
            return ClusterResponse::error(
                request.protocol_version,
                request.request_id,
                WireError::unsupported_protocol(request.protocol_version, PROTOCOL_VERSION),
            );
        }

        let result = match request.op.as_str() {
            names::CLAIM => self.handle_claim(&request),
            names::PUBLISH => self.handle_publish(&request),
            other => Err(WireError::unknown_operation(other)),
        };

        match result {
            Ok(payload) => ClusterResponse::success(PROTOCOL_VERSION, request.request_id, payload),
            Err(error) => ClusterResponse::error(PROTOCOL_VERSION, request.request_id, error),
        }
    }
}
