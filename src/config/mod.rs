//! Build configuration
//!
//! Configuration is merged from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Project config (`relay.toml`)
//! 3. CLI overrides (`--set key=value`)
//!
//! The coordinator only reads the typed [`BuildConfig`] extracted from the
//! merged result.

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{parse_override, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{merge_into, merge_layers};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Project config file name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "relay.toml";

/// Build-wide settings read by every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Allow dispatching plugin runs to worker processes.
    pub cluster: bool,
    /// Allow serving and storing cached plugin results.
    pub cache: bool,
    /// Cache namespace prefix.
    pub product: String,
    /// Number of worker processes.
    pub workers: usize,
    /// Root directory for the directory-backed cache.
    pub cache_dir: PathBuf,
    /// Bound on each master/worker round trip; `None` waits forever.
    pub transport_timeout_ms: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            cluster: defaults.cluster_enabled,
            cache: defaults.cache_enabled,
            product: defaults.product,
            workers: defaults.cluster_workers,
            cache_dir: PathBuf::from(defaults.cache_dir),
            transport_timeout_ms: None,
        }
    }
}

impl BuildConfig {
    /// Cache namespace prefix, falling back to `"default"` when blank.
    pub fn product_or_default(&self) -> &str {
        if self.product.is_empty() {
            "default"
        } else {
            &self.product
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_build_config() {
        let config = BuildConfig::default();
        assert!(config.cluster);
        assert!(config.cache);
        assert_eq!(config.product_or_default(), "default");
        assert!(config.transport_timeout_ms.is_none());
    }

    #[test]
    fn test_blank_product_falls_back() {
        let config = BuildConfig {
            product: String::new(),
            ..BuildConfig::default()
        };
        assert_eq!(config.product_or_default(), "default");
    }
}
