//! Plugin invocation coordinator
//!
//! One coordinator handles one (plugin, file) invocation and decides where
//! the result comes from:
//!
//! - master: cache hit, else dispatch to a worker (when the step is routable
//!   and clustering is allowed), else a local run; non-empty results are
//!   stored before `update` gets to see them
//! - worker: the dedup handshake with the master around a local run
//!
//! Local runs always go through the file's execution queue, so two plugins
//! never transform the same file at the same time.

use std::sync::Arc;
use std::time::Instant;

use relay_protocol::ops::DispatchRequest;
use tracing::{debug, trace};

use crate::cluster::ClusterClient;
use crate::context::{InvocationContext, RouteDescriptor};
use crate::error::{InvokeError, InvokeResult};
use crate::file::FileTask;
use crate::key::CacheKey;
use crate::plugin::{is_empty_output, Output, PluginAdapter, PluginClass};

/// Coordinates a single plugin invocation on a single file.
pub struct PluginInvocationCoordinator {
    adapter: PluginAdapter,
    ctx: InvocationContext,
}

impl PluginInvocationCoordinator {
    /// Instantiate `class` for `file`.
    ///
    /// On the master, fails with [`InvokeError::Configuration`] when the
    /// invocation would need a cache registry or a dispatch client that the
    /// context does not carry.
    pub fn new(
        class: Arc<dyn PluginClass>,
        file: Arc<FileTask>,
        ctx: InvocationContext,
    ) -> InvokeResult<Self> {
        let adapter = PluginAdapter::new(class, file, &ctx.options)?;
        let coordinator = Self { adapter, ctx };
        if coordinator.owns_decisions() {
            if coordinator.use_cache() && coordinator.ctx.caches.is_none() {
                return Err(coordinator.missing("a cache registry"));
            }
            if coordinator.dispatch_route().is_some() && coordinator.ctx.dispatcher.is_none() {
                return Err(coordinator.missing("a dispatch client"));
            }
        }
        Ok(coordinator)
    }

    pub fn adapter(&self) -> &PluginAdapter {
        &self.adapter
    }

    pub fn context(&self) -> &InvocationContext {
        &self.ctx
    }

    /// Master invocations that are not forced local make the cache and
    /// dispatch decisions.
    fn owns_decisions(&self) -> bool {
        self.ctx.is_master() && !self.ctx.flags.force_in_master
    }

    fn missing(&self, what: &str) -> InvokeError {
        InvokeError::Configuration(format!(
            "plugin {} on {} needs {} but none was provided",
            self.adapter.name(),
            self.adapter.file().path().display(),
            what
        ))
    }

    /// Whether this invocation may be dispatched to a worker.
    pub fn use_cluster(&self) -> bool {
        self.ctx.is_master()
            && self.ctx.config.cluster
            && !self.ctx.flags.disable_cluster
            && self.adapter.supports_cluster()
    }

    /// Whether cached results may be served and stored.
    pub fn use_cache(&self) -> bool {
        self.ctx.config.cache && self.adapter.supports_cache()
    }

    /// Cache namespace: `"{product}/{plugin name}"`.
    pub fn namespace(&self) -> String {
        format!("{}/{}", self.ctx.config.product_or_default(), self.adapter.name())
    }

    /// The route to dispatch on, when dispatch is possible at all.
    fn dispatch_route(&self) -> Option<&RouteDescriptor> {
        if !self.use_cluster() {
            return None;
        }
        self.ctx.ext.as_ref().filter(|route| !route.kind.is_empty())
    }

    /// Run the plugin locally, queued behind earlier work on the same file.
    pub async fn invoke_plugin_run(&self) -> InvokeResult<Output> {
        let output = self
            .adapter
            .file()
            .run_exclusive(self.adapter.name(), || self.adapter.run())
            .await?;
        Ok(output)
    }

    /// Master path: cache, then dispatch or local run, then store.
    pub async fn invoke_in_master(&self) -> InvokeResult<Output> {
        let mut store = None;
        if self.use_cache() {
            let caches = self
                .ctx
                .caches
                .as_ref()
                .ok_or_else(|| self.missing("a cache registry"))?;
            let client = caches.client(&self.namespace())?;
            let key = self.adapter.cache_key().await?;
            match client.get(key.as_str()).await? {
                Some(value) if !is_empty_output(Some(&value)) => {
                    debug!(plugin = self.adapter.name(), key = %key, "cache hit");
                    return Ok(Some(value));
                }
                _ => trace!(plugin = self.adapter.name(), key = %key, "cache miss"),
            }
            store = Some((client, key));
        }

        let output = match self.dispatch_route() {
            Some(route) => {
                let dispatcher = self
                    .ctx
                    .dispatcher
                    .as_ref()
                    .ok_or_else(|| self.missing("a dispatch client"))?;
                let request = DispatchRequest {
                    kind: route.kind.clone(),
                    plugin_index: route.plugin_index,
                    file_path: self.adapter.file().path_string(),
                };
                dispatcher.dispatch(&request).await?
            }
            None => self.invoke_plugin_run().await?,
        };

        if let (Some((client, key)), Some(value)) = (&store, &output) {
            if !is_empty_output(Some(value)) {
                client.set(key.as_str(), value).await?;
            }
        }
        Ok(output)
    }

    /// Worker path: claim, else run locally and publish.
    ///
    /// The whole handshake holds the file's queue turn, so a later
    /// invocation on the same file claims only after this one published.
    /// Without a claims client this is a plain local run.
    pub async fn invoke_in_worker(&self) -> InvokeResult<Output> {
        let Some(claims) = &self.ctx.claims else {
            return self.invoke_plugin_run().await;
        };

        let key = self.adapter.cache_key().await?;
        self.adapter
            .file()
            .run_exclusive(self.adapter.name(), || self.claim_or_compute(claims, &key))
            .await
    }

    async fn claim_or_compute(
        &self,
        claims: &ClusterClient,
        key: &CacheKey,
    ) -> InvokeResult<Output> {
        let file_path = self.adapter.file().path_string();
        if let Some(value) = claims.claim(key.as_str(), &file_path).await? {
            debug!(plugin = self.adapter.name(), file = %file_path, "reusing published result");
            return Ok(Some(value));
        }

        let output = self.adapter.run().await?;
        if let Some(value) = output.as_ref().filter(|v| !is_empty_output(Some(v))) {
            let accepted = claims.publish(key.as_str(), &file_path, value).await?;
            trace!(plugin = self.adapter.name(), file = %file_path, accepted, "published result");
        }
        Ok(output)
    }

    /// Produce the invocation's result.
    pub async fn run(&self) -> InvokeResult<Output> {
        let started = Instant::now();
        let output = if self.owns_decisions() {
            let raw = self.invoke_in_master().await?;
            self.adapter.mark_run();
            self.adapter.update(raw.as_ref()).await?.or(raw)
        } else {
            self.invoke_in_worker().await?
        };

        self.ctx.log(&format!(
            "{}: file={}, time={}ms",
            self.adapter.name(),
            self.adapter.file().path().display(),
            started.elapsed().as_millis()
        ));
        Ok(output)
    }
}
