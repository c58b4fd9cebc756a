//! Worker-side dispatch handler.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use relay_protocol::ops::{names, DispatchRequest, DispatchResponse};
use relay_protocol::{ClusterRequest, ClusterResponse, WireError, PROTOCOL_VERSION};
use serde_json::Value;

use super::client::ClusterClient;
use super::transport::RequestHandler;
use crate::config::BuildConfig;
use crate::context::{InvocationContext, LogSink, RouteDescriptor};
use crate::coordinator::PluginInvocationCoordinator;
use crate::error::InvokeError;
use crate::file::FileSet;
use crate::key::KeyError;
use crate::plugin::{PluginChain, PluginError};

/// Runs dispatched plugin steps in a worker process.
///
/// The worker resolves the step from its own copy of the plugin chain and
/// runs it with a worker-role coordinator, so the dedup handshake with the
/// master applies whenever a claims client is attached.
pub struct WorkerService {
    chain: Arc<PluginChain>,
    files: Arc<FileSet>,
    config: Arc<BuildConfig>,
    claims: Option<Arc<ClusterClient>>,
    log: Option<Arc<dyn LogSink>>,
}

impl WorkerService {
    pub fn new(chain: Arc<PluginChain>, files: Arc<FileSet>, config: Arc<BuildConfig>) -> Self {
        Self {
            chain,
            files,
            config,
            claims: None,
            log: None,
        }
    }

    /// Attach the client used for `claim`/`publish` against the master.
    pub fn with_claims(mut self, claims: Arc<ClusterClient>) -> Self {
        self.claims = Some(claims);
        self
    }

    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    async fn handle_dispatch(&self, request: &ClusterRequest) -> Result<Value, WireError> {
        let dispatch: DispatchRequest = request.decode_payload()?;
        let route = RouteDescriptor {
            kind: dispatch.kind,
            plugin_index: dispatch.plugin_index,
        };
        let step = self
            .chain
            .step(&route)
            .ok_or_else(|| WireError::unknown_plugin(&route.kind, route.plugin_index))?;
        let plugin = step.class.name().to_string();
        let file = self.files.get_or_load(Path::new(&dispatch.file_path));

        let mut ctx = InvocationContext::worker(Arc::clone(&self.config))
            .with_options(step.options.clone())
            .with_route(route);
        if let Some(claims) = &self.claims {
            ctx = ctx.with_claims(Arc::clone(claims));
        }
        if let Some(log) = &self.log {
            ctx = ctx.with_log(Arc::clone(log));
        }

        let outcome = match PluginInvocationCoordinator::new(Arc::clone(&step.class), file, ctx) {
            Ok(coordinator) => coordinator.run().await,
            Err(e) => Err(e),
        };
        let value = outcome.map_err(|e| to_wire_error(&plugin, &dispatch.file_path, e))?;

        serde_json::to_value(DispatchResponse { value })
            .map_err(|e| WireError::invalid_request(format!("unserializable response: {}", e)))
    }
}

fn to_wire_error(plugin: &str, file_path: &str, error: InvokeError) -> WireError {
    match &error {
        InvokeError::File(e)
        | InvokeError::Plugin(PluginError::File(e))
        | InvokeError::Key(KeyError::File(e)) => WireError::file_unavailable(file_path, e),
        _ => WireError::plugin_failed(plugin, file_path, &error),
    }
}

#[async_trait]
impl RequestHandler for WorkerService {
    async fn handle(&self, request: ClusterRequest) -> ClusterResponse {
        if request.protocol_version != PROTOCOL_VERSION {
            return ClusterResponse::error(
                request.protocol_version,
                request.request_id,
                WireError::unsupported_protocol(request.protocol_version, PROTOCOL_VERSION),
            );
        }

        let result = match request.op.as_str() {
            names::DISPATCH => self.handle_dispatch(&request).await,
            other => Err(WireError::unknown_operation(other)),
        };

        match result {
            Ok(payload) => ClusterResponse::success(PROTOCOL_VERSION, request.request_id, payload),
            Err(error) => {
                tracing::warn!(error = %error, request_id = %request.request_id, "dispatch failed");
                ClusterResponse::error(PROTOCOL_VERSION, request.request_id, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileTask;
    use crate::plugin::{Output, Plugin, PluginClass, PluginResult};
    use relay_protocol::ErrorCode;
    use serde_json::json;

    struct Length {
        file: Arc<FileTask>,
    }

    #[async_trait]
    impl Plugin for Length {
        async fn run(&self) -> PluginResult<Output> {
            let content = self.file.content().await?;
            Ok(Some(json!(content.len())))
        }
    }

    struct LengthClass;

    impl PluginClass for LengthClass {
        fn name(&self) -> &str {
            "length"
        }

        fn create(&self, file: Arc<FileTask>, _options: &Value) -> PluginResult<Box<dyn Plugin>> {
            Ok(Box::new(Length { file }))
        }
    }

    fn service(files: Arc<FileSet>) -> WorkerService {
        let mut chain = PluginChain::new();
        chain.push("txt", Arc::new(LengthClass), json!({}));
        WorkerService::new(Arc::new(chain), files, Arc::new(BuildConfig::default()))
    }

    fn dispatch(kind: &str, plugin_index: usize, file_path: &str) -> ClusterRequest {
        let request = DispatchRequest {
            kind: kind.to_string(),
            plugin_index,
            file_path: file_path.to_string(),
        };
        ClusterRequest::new(names::DISPATCH, "r1", &request).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_runs_step() {
        let files = Arc::new(FileSet::new());
        files.insert(FileTask::in_memory("a.txt", "hello"));
        let response = service(files).handle(dispatch("txt", 0, "a.txt")).await;
        let payload: DispatchResponse = response.into_payload().unwrap();
        assert_eq!(payload.value, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_unknown_step() {
        let response = service(Arc::new(FileSet::new()))
            .handle(dispatch("txt", 3, "a.txt"))
            .await;
        assert_eq!(response.error.unwrap().code, ErrorCode::UnknownPlugin);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let response = service(Arc::new(FileSet::new()))
            .handle(dispatch("txt", 0, "/nonexistent/relay/a.txt"))
            .await;
        assert_eq!(response.error.unwrap().code, ErrorCode::FileUnavailable);
    }

    #[tokio::test]
    async fn test_rejects_claim_op() {
        let request = ClusterRequest::new(names::CLAIM, "r1", &json!({})).unwrap();
        let response = service(Arc::new(FileSet::new())).handle(request).await;
        assert_eq!(response.error.unwrap().code, ErrorCode::UnknownOperation);
    }
}
