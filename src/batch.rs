//! Batch entry point: one plugin over many files.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::context::InvocationContext;
use crate::coordinator::PluginInvocationCoordinator;
use crate::error::InvokeResult;
use crate::file::FileTask;
use crate::plugin::{Output, PluginClass};

/// Results of a successful batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutput {
    /// Per-file outputs, in input order.
    pub results: Vec<Output>,
    /// What the class's `after` hook returned.
    pub after: Output,
}

/// Run `class` on every file concurrently.
///
/// The first failure fails the whole batch and no partial results are
/// returned. Once every file succeeded, the class's `after` hook runs exactly
/// once with all files and the first file's plugin instance.
pub async fn run_all(
    class: Arc<dyn PluginClass>,
    files: &[Arc<FileTask>],
    ctx: &InvocationContext,
) -> InvokeResult<BatchOutput> {
    let coordinators = files
        .iter()
        .map(|file| {
            PluginInvocationCoordinator::new(Arc::clone(&class), Arc::clone(file), ctx.clone())
        })
        .collect::<InvokeResult<Vec<_>>>()?;

    let results = try_join_all(coordinators.iter().map(|c| c.run())).await?;

    let representative = coordinators.first().map(|c| c.adapter().instance());
    let after = class.after(files, representative).await?;
    tracing::debug!(plugin = class.name(), files = files.len(), "batch complete");

    Ok(BatchOutput { results, after })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::error::InvokeError;
    use crate::plugin::{Plugin, PluginError, PluginResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Size {
        file: Arc<FileTask>,
    }

    #[async_trait]
    impl Plugin for Size {
        async fn run(&self) -> PluginResult<Output> {
            let text = self.file.content_string().await?;
            if text.contains("error") {
                return Err(PluginError::failed("size", "bad input"));
            }
            Ok(Some(json!(text.len())))
        }
    }

    #[derive(Default)]
    struct SizeClass {
        after_calls: AtomicUsize,
    }

    #[async_trait]
    impl PluginClass for SizeClass {
        fn name(&self) -> &str {
            "size"
        }

        fn create(&self, file: Arc<FileTask>, _options: &Value) -> PluginResult<Box<dyn Plugin>> {
            Ok(Box::new(Size { file }))
        }

        async fn after(
            &self,
            files: &[Arc<FileTask>],
            representative: Option<&dyn Plugin>,
        ) -> PluginResult<Output> {
            self.after_calls.fetch_add(1, Ordering::SeqCst);
            assert!(representative.is_some());
            Ok(Some(json!(files.len())))
        }
    }

    fn files(contents: &[&str]) -> Vec<Arc<FileTask>> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| Arc::new(FileTask::in_memory(format!("f{}.txt", i), c.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_batch_runs_every_file_then_after() {
        let class = Arc::new(SizeClass::default());
        let ctx = InvocationContext::master(Arc::new(BuildConfig::default()));
        let output = run_all(class.clone(), &files(&["a", "bb", "ccc"]), &ctx)
            .await
            .unwrap();

        assert_eq!(output.results, vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
        assert_eq!(output.after, Some(json!(3)));
        assert_eq!(class.after_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_fails_fast() {
        let class = Arc::new(SizeClass::default());
        let ctx = InvocationContext::master(Arc::new(BuildConfig::default()));
        let result = run_all(class.clone(), &files(&["a", "error", "c"]), &ctx).await;

        assert!(matches!(result, Err(InvokeError::Plugin(PluginError::Failed { .. }))));
        assert_eq!(class.after_calls.load(Ordering::SeqCst), 0);
    }
}
