//! Shared plugin fixtures for integration tests
//!
//! [`FixtureClass`] is a configurable plugin class. Every instance it creates
//! reports into a shared [`Recorder`], so tests can count runs, see the order in
//! which runs started and ended, and inspect what `update` and `after` saw.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use plugin_relay::plugin::IS_RUN_PROP;
use plugin_relay::{
    BuildConfig, Capability, FileTask, Output, Plugin, PluginClass, PluginError, PluginResult,
};

/// What a fixture plugin does when run.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return the file content as a JSON string.
    Echo,
    /// Return a fixed value.
    Constant(Value),
    /// Fail for files whose path contains the pattern, echo otherwise.
    FailOn(&'static str),
}

/// What `update` saw: the raw result and whether `__isRun__` had been set.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub raw: Option<Value>,
    pub is_run: bool,
}

/// Observations shared by every instance of one or more fixture classes.
#[derive(Debug, Default)]
pub struct Recorder {
    runs: AtomicUsize,
    events: Mutex<Vec<String>>,
    updates: Mutex<Vec<UpdateCall>>,
    after_calls: Mutex<Vec<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// `start:<plugin>:<path>` / `end:<plugin>:<path>` in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    /// File paths handed to each `after` call.
    pub fn after_calls(&self) -> Vec<Vec<String>> {
        self.after_calls.lock().unwrap().clone()
    }

    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

/// Configurable plugin class.
pub struct FixtureClass {
    name: String,
    cache: Capability,
    cluster: Capability,
    behavior: Behavior,
    update_override: Option<Value>,
    delay: Option<Duration>,
    recorder: Arc<Recorder>,
}

impl FixtureClass {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            cache: Capability::Fixed(false),
            cluster: Capability::Fixed(false),
            behavior,
            update_override: None,
            delay: None,
            recorder: Recorder::new(),
        }
    }

    pub fn echo(name: &str) -> Self {
        Self::new(name, Behavior::Echo)
    }

    pub fn constant(name: &str, value: Value) -> Self {
        Self::new(name, Behavior::Constant(value))
    }

    pub fn cached(mut self) -> Self {
        self.cache = Capability::Fixed(true);
        self
    }

    pub fn clustered(mut self) -> Self {
        self.cluster = Capability::Fixed(true);
        self
    }

    pub fn with_cache(mut self, cache: Capability) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `update` return `value` instead of keeping the raw result.
    pub fn overriding_update(mut self, value: Value) -> Self {
        self.update_override = Some(value);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        Arc::clone(&self.recorder)
    }

    pub fn into_class(self) -> (Arc<dyn PluginClass>, Arc<Recorder>) {
        let recorder = self.recorder();
        (Arc::new(self), recorder)
    }
}

struct FixtureInstance {
    plugin: String,
    file: Arc<FileTask>,
    behavior: Behavior,
    update_override: Option<Value>,
    delay: Option<Duration>,
    recorder: Arc<Recorder>,
    is_run: AtomicBool,
}

#[async_trait]
impl Plugin for FixtureInstance {
    async fn run(&self) -> PluginResult<Output> {
        let path = self.file.path_string();
        self.recorder.event(format!("start:{}:{}", self.plugin, path));
        self.recorder.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let output = match &self.behavior {
            Behavior::Constant(value) => Ok(Some(value.clone())),
            Behavior::FailOn(pattern) if path.contains(pattern) => {
                Err(PluginError::failed(&self.plugin, format!("refusing {}", path)))
            }
            Behavior::Echo | Behavior::FailOn(_) => {
                let text = self.file.content_string().await?;
                Ok(Some(Value::String(text)))
            }
        };

        self.recorder.event(format!("end:{}:{}", self.plugin, path));
        output
    }

    async fn update(&self, output: Option<&Value>) -> PluginResult<Output> {
        self.recorder.updates.lock().unwrap().push(UpdateCall {
            raw: output.cloned(),
            is_run: self.is_run.load(Ordering::SeqCst),
        });
        Ok(self.update_override.clone())
    }

    fn prop(&self, key: &str, value: Value) {
        if key == IS_RUN_PROP {
            self.is_run.store(value == json!(true), Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl PluginClass for FixtureClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn cache(&self) -> Capability {
        self.cache.clone()
    }

    fn cluster(&self) -> Capability {
        self.cluster.clone()
    }

    fn create(&self, file: Arc<FileTask>, _options: &Value) -> PluginResult<Box<dyn Plugin>> {
        Ok(Box::new(FixtureInstance {
            plugin: self.name.clone(),
            file,
            behavior: self.behavior.clone(),
            update_override: self.update_override.clone(),
            delay: self.delay,
            recorder: Arc::clone(&self.recorder),
            is_run: AtomicBool::new(false),
        }))
    }

    async fn after(
        &self,
        files: &[Arc<FileTask>],
        _representative: Option<&dyn Plugin>,
    ) -> PluginResult<Output> {
        let paths = files.iter().map(|f| f.path_string()).collect::<Vec<_>>();
        let count = paths.len();
        self.recorder.after_calls.lock().unwrap().push(paths);
        Ok(Some(json!({ "after": count })))
    }
}

/// Default build config as a shared handle.
pub fn config() -> Arc<BuildConfig> {
    Arc::new(BuildConfig::default())
}

/// In-memory file task.
pub fn file(path: &str, content: &str) -> Arc<FileTask> {
    Arc::new(FileTask::in_memory(path, content))
}
