//! Transport layer between master and workers
//!
//! Abstracts the process boundary for testability:
//! - [`Transport`]: carries one request envelope and returns its response
//! - [`RequestHandler`]: the receiving side (master hub or worker service)
//! - [`InProcessTransport`]: JSON round trip into a handler in this process
//! - [`WorkerPool`]: round-robin over several worker transports

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use relay_protocol::{ClusterRequest, ClusterResponse};

/// Transport trait for cluster communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the response
    async fn execute(&self, request: &ClusterRequest) -> Result<ClusterResponse, TransportError>;
}

/// Receiving side of a transport.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one request. Failures are reported inside the response.
    async fn handle(&self, request: ClusterRequest) -> ClusterResponse;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport closed: {0}")]
    Closed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Delivers requests to a handler living in the same process.
///
/// Both envelopes are serialized and parsed again on the way through, so
/// anything that would not survive a real process boundary fails here too.
pub struct InProcessTransport {
    handler: Arc<dyn RequestHandler>,
}

impl InProcessTransport {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn execute(&self, request: &ClusterRequest) -> Result<ClusterResponse, TransportError> {
        let request: ClusterRequest = serde_json::from_str(&serde_json::to_string(request)?)?;
        let response = self.handler.handle(request).await;
        Ok(serde_json::from_str(&serde_json::to_string(&response)?)?)
    }
}

/// Spreads requests over worker transports in turn.
pub struct WorkerPool {
    workers: Vec<Arc<dyn Transport>>,
    next: AtomicUsize,
}

impl WorkerPool {
    pub fn new(workers: Vec<Arc<dyn Transport>>) -> Self {
        Self {
            workers,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[async_trait]
impl Transport for WorkerPool {
    async fn execute(&self, request: &ClusterRequest) -> Result<ClusterResponse, TransportError> {
        if self.workers.is_empty() {
            return Err(TransportError::Closed("worker pool is empty".to_string()));
        }
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        tracing::trace!(worker = slot, op = %request.op, "routing request");
        self.workers[slot].execute(request).await
    }
}
