//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Cache namespace prefix (default: "default")
    pub product: String,

    /// Cluster dispatch enabled (default: true)
    pub cluster_enabled: bool,

    /// Worker process count (default: 0, everything runs in the master)
    pub cluster_workers: usize,

    /// Result cache enabled (default: true)
    pub cache_enabled: bool,

    /// Directory-backed cache root (default: ".relay-cache")
    pub cache_dir: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            product: "default".to_string(),
            cluster_enabled: true,
            cluster_workers: 0,
            cache_enabled: true,
            cache_dir: ".relay-cache".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to the layered config shape for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "product": self.product,
            "cluster": {
                "enabled": self.cluster_enabled,
                "workers": self.cluster_workers
            },
            "cache": {
                "enabled": self.cache_enabled,
                "dir": self.cache_dir
            }
        })
    }
}
