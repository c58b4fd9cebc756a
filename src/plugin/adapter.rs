//! Uniform wrapper around one plugin instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::file::{FileResult, FileTask};
use crate::key::{CacheKey, KeyError};

use super::{Output, Plugin, PluginClass, PluginResult, IS_RUN_PROP};

/// A plugin class instantiated for one file, with the options it was built
/// with. Created per invocation and dropped when the invocation finishes.
pub struct PluginAdapter {
    class: Arc<dyn PluginClass>,
    instance: Box<dyn Plugin>,
    file: Arc<FileTask>,
    options: Value,
    has_run: AtomicBool,
}

impl PluginAdapter {
    /// Instantiate `class` for `file`.
    pub fn new(
        class: Arc<dyn PluginClass>,
        file: Arc<FileTask>,
        options: &Value,
    ) -> PluginResult<Self> {
        let instance = class.create(Arc::clone(&file), options)?;
        Ok(Self {
            class,
            instance,
            file,
            options: options.clone(),
            has_run: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        self.class.name()
    }

    pub fn class(&self) -> &Arc<dyn PluginClass> {
        &self.class
    }

    pub fn instance(&self) -> &dyn Plugin {
        self.instance.as_ref()
    }

    pub fn file(&self) -> &Arc<FileTask> {
        &self.file
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    /// Evaluate the class's cache capability now.
    pub fn supports_cache(&self) -> bool {
        self.class.cache().evaluate()
    }

    /// Evaluate the class's cluster capability now.
    pub fn supports_cluster(&self) -> bool {
        self.class.cluster().evaluate()
    }

    pub async fn run(&self) -> PluginResult<Output> {
        self.instance.run().await
    }

    pub async fn update(&self, output: Option<&Value>) -> PluginResult<Output> {
        self.instance.update(output).await
    }

    pub async fn content(&self) -> FileResult<Arc<[u8]>> {
        self.file.content().await
    }

    /// SHA-256 hex digest of the file content.
    pub async fn content_digest(&self) -> FileResult<String> {
        self.file.content_digest().await
    }

    /// Cache key for this (plugin, options, content) combination.
    pub async fn cache_key(&self) -> Result<CacheKey, KeyError> {
        CacheKey::for_file(&self.class.definition(), &self.options, &self.file).await
    }

    /// Forward a property to the instance.
    pub fn prop(&self, key: &str, value: Value) {
        if key == IS_RUN_PROP {
            self.has_run.store(value.as_bool().unwrap_or(false), Ordering::SeqCst);
        }
        self.instance.prop(key, value);
    }

    /// Record that the result about to be handed to `update` went through
    /// the master execution path.
    pub fn mark_run(&self) {
        self.prop(IS_RUN_PROP, Value::Bool(true));
    }

    pub fn has_run(&self) -> bool {
        self.has_run.load(Ordering::SeqCst)
    }
}
