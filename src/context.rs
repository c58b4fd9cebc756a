//! Per-invocation context
//!
//! Everything a coordinator needs besides the plugin class and the file: the
//! process role, build config, plugin options, routing, and the optional
//! collaborators (cache registry, cluster clients, log sink).

use std::fmt;
use std::io;
use std::sync::Arc;

use relay_cache::CacheRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cluster::ClusterClient;
use crate::config::BuildConfig;

/// Which side of the cluster this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Orchestrating process: owns the cache and dispatches to workers.
    Master,
    /// Process that executes dispatched plugin runs.
    Worker,
}

/// Names one plugin step so another process can find the same step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub plugin_index: usize,
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationFlags {
    /// Never dispatch, even when config and plugin allow it.
    pub disable_cluster: bool,
    /// Treat a master invocation like a worker one: skip cache, dispatch
    /// and `update`.
    pub force_in_master: bool,
}

/// Destination for human-readable timing lines.
pub trait LogSink: Send + Sync {
    fn record(&self, line: &str) -> io::Result<()>;
}

impl<F> LogSink for F
where
    F: Fn(&str) -> io::Result<()> + Send + Sync,
{
    fn record(&self, line: &str) -> io::Result<()> {
        self(line)
    }
}

/// Ambient inputs to one invocation.
#[derive(Clone)]
pub struct InvocationContext {
    pub role: Role,
    pub config: Arc<BuildConfig>,
    /// Resolved plugin options, hashed into cache keys.
    pub options: Value,
    /// Route of the plugin step; required for dispatch.
    pub ext: Option<RouteDescriptor>,
    pub flags: InvocationFlags,
    pub caches: Option<Arc<CacheRegistry>>,
    /// Master side: sends `dispatch` to workers.
    pub dispatcher: Option<Arc<ClusterClient>>,
    /// Worker side: sends `claim`/`publish` to the master.
    pub claims: Option<Arc<ClusterClient>>,
    pub log: Option<Arc<dyn LogSink>>,
}

impl InvocationContext {
    fn new(role: Role, config: Arc<BuildConfig>) -> Self {
        Self {
            role,
            config,
            options: Value::Object(Default::default()),
            ext: None,
            flags: InvocationFlags::default(),
            caches: None,
            dispatcher: None,
            claims: None,
            log: None,
        }
    }

    pub fn master(config: Arc<BuildConfig>) -> Self {
        Self::new(Role::Master, config)
    }

    pub fn worker(config: Arc<BuildConfig>) -> Self {
        Self::new(Role::Worker, config)
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_route(mut self, route: RouteDescriptor) -> Self {
        self.ext = Some(route);
        self
    }

    pub fn with_caches(mut self, caches: Arc<CacheRegistry>) -> Self {
        self.caches = Some(caches);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<ClusterClient>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_claims(mut self, claims: Arc<ClusterClient>) -> Self {
        self.claims = Some(claims);
        self
    }

    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn without_cluster(mut self) -> Self {
        self.flags.disable_cluster = true;
        self
    }

    pub fn forced_in_master(mut self) -> Self {
        self.flags.force_in_master = true;
        self
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    /// Send a line to the log sink, if any. Sink failures are reported and
    /// otherwise ignored.
    pub fn log(&self, line: &str) {
        if let Some(sink) = &self.log {
            if let Err(e) = sink.record(line) {
                tracing::warn!(error = %e, "log sink rejected line");
            }
        }
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("role", &self.role)
            .field("config", &self.config)
            .field("options", &self.options)
            .field("ext", &self.ext)
            .field("flags", &self.flags)
            .field("caches", &self.caches.is_some())
            .field("dispatcher", &self.dispatcher.is_some())
            .field("claims", &self.claims.is_some())
            .field("log", &self.log.is_some())
            .finish()
    }
}
