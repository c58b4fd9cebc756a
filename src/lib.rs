//! Plugin Relay - plugin invocation coordinator
//!
//! Decides, for every (plugin, file) pair in a multi-process compilation
//! pipeline, whether to serve a cached result, dispatch the run to a worker
//! process, or run the plugin locally, and keeps identical computations from
//! running twice across processes.

pub mod batch;
pub mod cluster;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod file;
pub mod key;
pub mod plugin;
pub mod timeout;

pub use batch::{run_all, BatchOutput};
pub use cluster::{ClusterClient, ClusterError, LocalCluster, MasterHub, WorkerService};
pub use config::{BuildConfig, EffectiveConfig};
pub use context::{InvocationContext, InvocationFlags, LogSink, Role, RouteDescriptor};
pub use coordinator::PluginInvocationCoordinator;
pub use error::{FailureKind, InvokeError, InvokeResult};
pub use file::{FileError, FileSet, FileTask};
pub use key::{CacheKey, CacheKeyInputs, KeyError};
pub use plugin::{Capability, Output, Plugin, PluginAdapter, PluginClass, PluginError, PluginResult};
pub use timeout::TimeoutPolicy;
