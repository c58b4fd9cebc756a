//! Master/worker plumbing
//!
//! The master dispatches plugin steps to workers; workers deduplicate work
//! through the master's claim registry. Every exchange is one
//! `relay_protocol` envelope carried by a [`Transport`].

mod client;
mod master;
mod transport;
mod worker;

pub use client::{ClusterClient, ClusterError, ClusterResult};
pub use master::{ClaimRegistry, ClaimStats, MasterHub};
pub use transport::{InProcessTransport, RequestHandler, Transport, TransportError, WorkerPool};
pub use worker::WorkerService;

use std::sync::Arc;

use crate::config::BuildConfig;
use crate::context::LogSink;
use crate::file::FileSet;
use crate::plugin::PluginChain;
use crate::timeout::TimeoutPolicy;

/// A master hub and its workers wired together inside one process.
///
/// Workers share the given [`FileSet`]; each reaches the hub through its own
/// claims client, and the master reaches the workers through a round-robin
/// dispatch client.
pub struct LocalCluster {
    hub: Arc<MasterHub>,
    workers: Vec<Arc<WorkerService>>,
    dispatcher: Arc<ClusterClient>,
}

impl LocalCluster {
    /// Start `config.workers` workers (at least one).
    pub fn start(chain: Arc<PluginChain>, files: Arc<FileSet>, config: Arc<BuildConfig>) -> Self {
        Self::start_with_log(chain, files, config, None)
    }

    pub fn start_with_log(
        chain: Arc<PluginChain>,
        files: Arc<FileSet>,
        config: Arc<BuildConfig>,
        log: Option<Arc<dyn LogSink>>,
    ) -> Self {
        let timeout = TimeoutPolicy::from_millis(config.transport_timeout_ms);
        let hub = Arc::new(MasterHub::new());
        let count = config.workers.max(1);

        let workers: Vec<Arc<WorkerService>> = (0..count)
            .map(|_| {
                let to_master: Arc<dyn Transport> = Arc::new(InProcessTransport::new(hub.clone()));
                let claims = Arc::new(ClusterClient::with_timeout(to_master, timeout));
                let mut service = WorkerService::new(chain.clone(), files.clone(), config.clone())
                    .with_claims(claims);
                if let Some(log) = &log {
                    service = service.with_log(log.clone());
                }
                Arc::new(service)
            })
            .collect();

        let transports = workers
            .iter()
            .map(|w| Arc::new(InProcessTransport::new(w.clone())) as Arc<dyn Transport>)
            .collect();
        let dispatcher = Arc::new(ClusterClient::with_timeout(
            Arc::new(WorkerPool::new(transports)),
            timeout,
        ));

        tracing::debug!(workers = count, "local cluster started");
        Self {
            hub,
            workers,
            dispatcher,
        }
    }

    pub fn hub(&self) -> &Arc<MasterHub> {
        &self.hub
    }

    pub fn workers(&self) -> &[Arc<WorkerService>] {
        &self.workers
    }

    /// Client for the master's coordinators.
    pub fn dispatcher(&self) -> Arc<ClusterClient> {
        self.dispatcher.clone()
    }
}
