//! Typed cluster client
//!
//! Wraps a [`Transport`] with the three cluster operations. The master holds
//! one pointed at its workers (`dispatch`); each worker holds one pointed at
//! the master (`claim`, `publish`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use relay_protocol::ops::{
    names, ClaimRequest, ClaimResponse, DispatchRequest, DispatchResponse, PublishRequest,
    PublishResponse,
};
use relay_protocol::{ClusterRequest, WireError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::transport::{Transport, TransportError};
use crate::timeout::TimeoutPolicy;

/// Cluster client errors
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Remote error: {0}")]
    Remote(WireError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),
}

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Client side of the cluster protocol.
pub struct ClusterClient {
    transport: Arc<dyn Transport>,
    timeout: TimeoutPolicy,
    /// Request ID counter
    request_counter: AtomicU64,
}

impl ClusterClient {
    /// Create a client that waits indefinitely for responses
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, TimeoutPolicy::unbounded())
    }

    pub fn with_timeout(transport: Arc<dyn Transport>, timeout: TimeoutPolicy) -> Self {
        Self {
            transport,
            timeout,
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    /// Generate a unique request ID
    fn next_request_id(&self) -> String {
        let counter = self.request_counter.fetch_add(1, Ordering::SeqCst);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("req-{:x}-{:08x}", timestamp, counter)
    }

    async fn call<Req, Resp>(&self, op: &str, payload: &Req) -> ClusterResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let request_id = self.next_request_id();
        let request =
            ClusterRequest::new(op, request_id.clone(), payload).map_err(ClusterError::Remote)?;

        let response = self
            .timeout
            .bound(self.transport.execute(&request))
            .await
            .map_err(ClusterError::Timeout)??;

        if response.request_id != request_id {
            return Err(ClusterError::Protocol(format!(
                "response to {} carries request_id {}, expected {}",
                op, response.request_id, request_id
            )));
        }
        response.into_payload().map_err(ClusterError::Remote)
    }

    // === Public operations ===

    /// Run a plugin step on a worker and return its raw output.
    pub async fn dispatch(&self, request: &DispatchRequest) -> ClusterResult<Option<Value>> {
        tracing::debug!(
            kind = %request.kind,
            plugin_index = request.plugin_index,
            file = %request.file_path,
            "dispatching to worker"
        );
        let response: DispatchResponse = self.call(names::DISPATCH, request).await?;
        Ok(response.value)
    }

    /// Ask the master for a value already published under `key`.
    pub async fn claim(&self, key: &str, file_path: &str) -> ClusterResult<Option<Value>> {
        let request = ClaimRequest {
            key: key.to_string(),
            file_path: file_path.to_string(),
        };
        let response: ClaimResponse = self.call(names::CLAIM, &request).await?;
        match (response.found, response.value) {
            (true, Some(value)) => Ok(Some(value)),
            (true, None) => Err(ClusterError::Protocol(format!(
                "claim for {} found without a value",
                key
            ))),
            (false, _) => Ok(None),
        }
    }

    /// Report a computed value. Returns false when another worker won.
    pub async fn publish(&self, key: &str, file_path: &str, value: &Value) -> ClusterResult<bool> {
        let request = PublishRequest {
            key: key.to_string(),
            file_path: file_path.to_string(),
            value: value.clone(),
        };
        let response: PublishResponse = self.call(names::PUBLISH, &request).await?;
        Ok(response.accepted)
    }
}
