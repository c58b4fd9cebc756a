//! Batch Tests
//!
//! `run_all`: concurrent fan-out, fail-fast, and the once-per-batch `after`
//! hook.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use relay_cache::{CacheRegistry, MemoryBackend};
use serde_json::json;

use fixtures::{config, file, Behavior, FixtureClass};
use plugin_relay::{run_all, InvocationContext, InvokeError, PluginError};

#[tokio::test]
async fn test_after_runs_once_with_all_files() {
    let (class, recorder) = FixtureClass::echo("echo").into_class();
    let files = vec![file("a.js", "a"), file("b.js", "b"), file("c.js", "c")];
    let ctx = InvocationContext::master(config());

    let output = run_all(class, &files, &ctx).await.unwrap();

    assert_eq!(output.results, vec![Some(json!("a")), Some(json!("b")), Some(json!("c"))]);
    assert_eq!(output.after, Some(json!({"after": 3})));
    assert_eq!(recorder.after_calls(), vec![vec!["a.js", "b.js", "c.js"]]);
    assert_eq!(recorder.runs(), 3);
}

#[tokio::test]
async fn test_files_run_concurrently() {
    let (class, recorder) = FixtureClass::echo("echo")
        .with_delay(Duration::from_millis(20))
        .into_class();
    let files = vec![file("a.js", "a"), file("b.js", "b")];
    let ctx = InvocationContext::master(config());

    run_all(class, &files, &ctx).await.unwrap();

    // Distinct files have distinct queues: the second run starts before the
    // first one ends.
    let events = recorder.events();
    assert_eq!(events[0], "start:echo:a.js");
    assert_eq!(events[1], "start:echo:b.js");
}

#[tokio::test]
async fn test_one_failure_fails_the_batch() {
    let (class, recorder) = FixtureClass::new("strict", Behavior::FailOn("b.js")).into_class();
    let files = vec![file("a.js", "a"), file("b.js", "b"), file("c.js", "c")];
    let ctx = InvocationContext::master(config());

    let result = run_all(class, &files, &ctx).await;

    match result {
        Err(InvokeError::Plugin(PluginError::Failed { plugin, .. })) => {
            assert_eq!(plugin, "strict")
        }
        other => panic!("expected plugin failure, got {:?}", other),
    }
    assert!(recorder.after_calls().is_empty(), "after must not run for a failed batch");
}

#[tokio::test]
async fn test_construction_failure_runs_nothing() {
    let (class, recorder) = FixtureClass::echo("echo").cached().into_class();
    let files = vec![file("a.js", "a"), file("b.js", "b")];

    // Cache capability on, but no registry.
    let ctx = InvocationContext::master(config());
    let result = run_all(class, &files, &ctx).await;

    assert!(matches!(result, Err(InvokeError::Configuration(_))));
    assert_eq!(recorder.runs(), 0);
    assert!(recorder.after_calls().is_empty());
}

#[tokio::test]
async fn test_batch_shares_cache_registry() {
    let (class, recorder) = FixtureClass::echo("echo").cached().into_class();
    let backend = MemoryBackend::new();
    let registry = Arc::new(CacheRegistry::new(Arc::new(backend.clone())));
    let files = vec![file("a.js", "a"), file("b.js", "b")];
    let ctx = InvocationContext::master(config()).with_caches(registry.clone());

    run_all(class.clone(), &files, &ctx).await.unwrap();
    run_all(class, &files, &ctx).await.unwrap();

    assert_eq!(recorder.runs(), 2);
    assert_eq!(registry.open_count(), 1);
    assert_eq!(backend.stats().hits, 2);
    assert_eq!(recorder.after_calls().len(), 2);
}

#[tokio::test]
async fn test_empty_batch_still_calls_after() {
    let (class, recorder) = FixtureClass::echo("echo").into_class();
    let ctx = InvocationContext::master(config());

    let output = run_all(class, &[], &ctx).await.unwrap();

    assert!(output.results.is_empty());
    assert_eq!(output.after, Some(json!({"after": 0})));
    assert_eq!(recorder.after_calls(), vec![Vec::<String>::new()]);
}
