//! Directory Cache Tests
//!
//! End-to-end runs against on-disk sources and the directory-backed cache,
//! configured through a project config file.

mod fixtures;

use std::fs;
use std::sync::Arc;

use relay_cache::{CacheBackend, CacheRegistry, DirBackend};
use serde_json::json;
use tempfile::TempDir;

use fixtures::FixtureClass;
use plugin_relay::{
    BuildConfig, CacheKey, EffectiveConfig, FileSet, FileTask, InvocationContext, InvokeError,
    PluginInvocationCoordinator,
};

fn write_project(dir: &TempDir, product: &str) -> Arc<BuildConfig> {
    let cache_dir = dir.path().join("cache");
    let config_path = dir.path().join("relay.toml");
    fs::write(
        &config_path,
        format!(
            "product = \"{}\"\n\n[cache]\ndir = \"{}\"\n",
            product,
            cache_dir.display()
        ),
    )
    .unwrap();
    let effective = EffectiveConfig::build(Some(&config_path), None).unwrap();
    Arc::new(effective.build_config())
}

fn dir_registry(config: &BuildConfig) -> Arc<CacheRegistry> {
    Arc::new(CacheRegistry::new(Arc::new(DirBackend::new(config.cache_dir.clone()))))
}

#[tokio::test]
async fn test_results_persist_across_registries() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir, "site");
    let source = dir.path().join("main.js");
    fs::write(&source, "console.log(1)").unwrap();

    let (class, recorder) = FixtureClass::echo("echo").cached().into_class();

    // Two registries over the same directory stand in for two builds.
    for _ in 0..2 {
        let files = FileSet::new();
        let registry = dir_registry(&config);
        let ctx = InvocationContext::master(config.clone()).with_caches(registry);
        let coordinator =
            PluginInvocationCoordinator::new(class.clone(), files.get_or_load(&source), ctx)
                .unwrap();
        assert_eq!(coordinator.run().await.unwrap(), Some(json!("console.log(1)")));
    }

    assert_eq!(recorder.runs(), 1);

    let key = CacheKey::for_file("echo", &json!({}), &FileTask::from_disk(&source))
        .await
        .unwrap();
    let client = DirBackend::new(config.cache_dir.clone()).open("site/echo").unwrap();
    assert_eq!(client.get(key.as_str()).await.unwrap(), Some(json!("console.log(1)")));
}

#[tokio::test]
async fn test_changed_source_misses_cache() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir, "site");
    let source = dir.path().join("main.js");
    let (class, recorder) = FixtureClass::echo("echo").cached().into_class();
    let registry = dir_registry(&config);

    for content in ["v1", "v2", "v1"] {
        fs::write(&source, content).unwrap();
        // A fresh file task per build: content is loaded once per task.
        let files = FileSet::new();
        let ctx = InvocationContext::master(config.clone()).with_caches(registry.clone());
        let coordinator =
            PluginInvocationCoordinator::new(class.clone(), files.get_or_load(&source), ctx)
                .unwrap();
        assert_eq!(coordinator.run().await.unwrap(), Some(json!(content)));
    }

    assert_eq!(recorder.runs(), 2);
}

#[tokio::test]
async fn test_missing_source_is_file_error() {
    let dir = TempDir::new().unwrap();
    let config = write_project(&dir, "site");
    let (class, recorder) = FixtureClass::echo("echo").cached().into_class();
    let registry = dir_registry(&config);

    let files = FileSet::new();
    let ctx = InvocationContext::master(config).with_caches(registry);
    let coordinator = PluginInvocationCoordinator::new(
        class,
        files.get_or_load(&dir.path().join("absent.js")),
        ctx,
    )
    .unwrap();

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, InvokeError::Key(_)));
    assert_eq!(err.exit_code(), 30);
    assert_eq!(recorder.runs(), 0);
}
