//! Plugin contract
//!
//! A plugin is described by a [`PluginClass`] (identity, capabilities, batch
//! hook) and instantiated once per file as a [`Plugin`]. The coordinator only
//! talks to plugins through a [`PluginAdapter`].

mod adapter;
mod capability;
mod registry;

pub use adapter::PluginAdapter;
pub use capability::Capability;
pub use registry::{PluginChain, PluginStep};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::file::{FileError, FileTask};

/// Output of a plugin run. `None` means the plugin produced nothing.
pub type Output = Option<Value>;

/// Prop set on an instance once its result came from a genuine execution path.
pub const IS_RUN_PROP: &str = "__isRun__";

/// Plugin result type
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised by plugin code
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {plugin} failed: {message}")]
    Failed { plugin: String, message: String },

    #[error("plugin {plugin} rejected its options: {message}")]
    InvalidOptions { plugin: String, message: String },

    #[error(transparent)]
    File(#[from] FileError),
}

impl PluginError {
    /// Convenience constructor for a failed run.
    pub fn failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// A plugin instance bound to one file.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Transform the file.
    async fn run(&self) -> PluginResult<Output>;

    /// Post-process the raw result on the master. `None` keeps the raw result.
    async fn update(&self, output: Option<&Value>) -> PluginResult<Output> {
        let _ = output;
        Ok(None)
    }

    /// Receive a coordinator-set property such as [`IS_RUN_PROP`].
    fn prop(&self, key: &str, value: Value) {
        let _ = (key, value);
    }
}

/// Static description of a plugin.
#[async_trait]
pub trait PluginClass: Send + Sync {
    /// Plugin name, also the last segment of its cache namespace.
    fn name(&self) -> &str;

    /// Serializable identity hashed into cache keys. Change it whenever the
    /// plugin's output for the same input would change.
    fn definition(&self) -> String {
        self.name().to_string()
    }

    /// Whether results may be cached.
    fn cache(&self) -> Capability {
        Capability::Fixed(false)
    }

    /// Whether runs may be dispatched to a worker process.
    fn cluster(&self) -> Capability {
        Capability::Fixed(false)
    }

    /// Build the instance for one file.
    fn create(&self, file: Arc<FileTask>, options: &Value) -> PluginResult<Box<dyn Plugin>>;

    /// Batch hook, called once after every file in a batch succeeded.
    async fn after(
        &self,
        files: &[Arc<FileTask>],
        representative: Option<&dyn Plugin>,
    ) -> PluginResult<Output> {
        let _ = (files, representative);
        Ok(None)
    }
}

/// Whether an output counts as empty: absent, `null`, `false`, `0` or `""`.
///
/// Empty outputs are never cached or published.
pub fn is_empty_output(output: Option<&Value>) -> bool {
    match output {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}
