//! Effective configuration with provenance
//!
//! Records the merged configuration together with the sources that
//! contributed to it, then extracts the typed [`BuildConfig`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::BuildConfig;
use crate::timeout::TimeoutPolicy;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "plugin-relay/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Project,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from the project file and CLI overrides.
    ///
    /// A missing project file is skipped; an unreadable or malformed one is an error.
    pub fn build(
        project_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = project_path.filter(|p| p.exists()) {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Project,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        let value = serde_json::to_value(table)
            .map_err(|e| ConfigError::ParseError(format!("unrepresentable TOML value: {}", e)))?;
        Ok((value, digest))
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        for path in ["cluster.enabled", "cache.enabled"] {
            if let Some(v) = lookup(config, path) {
                if !v.is_boolean() {
                    return Err(ConfigError::ValidationError(format!("{} must be a boolean", path)));
                }
            }
        }

        if let Some(product) = lookup(config, "product") {
            let valid = product
                .as_str()
                .map(|p| !p.is_empty() && !p.contains(['/', '\\']) && p != "." && p != "..")
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::ValidationError(
                    "product must be a non-empty name without path separators".to_string(),
                ));
            }
        }

        if let Some(workers) = lookup(config, "cluster.workers") {
            if workers.as_u64().is_none() {
                return Err(ConfigError::ValidationError(
                    "cluster.workers must be a non-negative integer".to_string(),
                ));
            }
        }

        if let Some(timeout) = lookup(config, "cluster.timeout_ms").filter(|v| !v.is_null()) {
            let ms = timeout.as_u64().ok_or_else(|| {
                ConfigError::ValidationError(
                    "cluster.timeout_ms must be a non-negative integer".to_string(),
                )
            })?;
            TimeoutPolicy::from_millis(Some(ms))
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("cluster.timeout_ms: {}", e)))?;
        }

        Ok(())
    }

    /// Extract the typed build configuration.
    pub fn build_config(&self) -> BuildConfig {
        let defaults = BuildConfig::default();
        BuildConfig {
            cluster: self.get_bool("cluster.enabled").unwrap_or(defaults.cluster),
            cache: self.get_bool("cache.enabled").unwrap_or(defaults.cache),
            product: self
                .get_str("product")
                .map(str::to_string)
                .unwrap_or(defaults.product),
            workers: self
                .get_u64("cluster.workers")
                .map(|w| w as usize)
                .unwrap_or(defaults.workers),
            cache_dir: self
                .get_str("cache.dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            transport_timeout_ms: self.get_u64("cluster.timeout_ms"),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.config, path)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }
}

fn lookup<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(config, |current, part| current.get(part))
}

/// Turn a `dotted.key=value` CLI override into a nested config object.
///
/// The value is parsed as JSON when possible (`true`, `4`, `null`), otherwise
/// taken as a plain string.
pub fn parse_override(spec: &str) -> Result<Value, ConfigError> {
    let (path, raw) = spec
        .split_once('=')
        .ok_or_else(|| ConfigError::ParseError(format!("expected key=value, got {:?}", spec)))?;
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ConfigError::ParseError(format!("invalid key in {:?}", spec)));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok(path
        .rsplit('.')
        .fold(value, |inner, key| serde_json::json!({ key: inner })))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
