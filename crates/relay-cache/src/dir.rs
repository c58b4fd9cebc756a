//! Directory-backed cache backend.
//!
//! Layout: `<root>/<namespace>/<key[..2]>/<key>.json`. Each file holds a
//! [`CacheEntry`]. Writes go to a temporary sibling first and are renamed into
//! place, so readers never observe a half-written entry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{CacheBackend, CacheClient};
use crate::error::{CacheError, CacheResult};

/// One stored value plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: String,
    /// Namespace the entry belongs to
    pub namespace: String,
    /// When the entry was written (RFC 3339)
    pub created_at: String,
    /// The cached plugin output
    pub value: Value,
}

/// Backend rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    /// Create a backend rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CacheBackend for DirBackend {
    fn open(&self, namespace: &str) -> CacheResult<Arc<dyn CacheClient>> {
        crate::validate_namespace(namespace)?;
        let dir = namespace
            .split('/')
            .fold(self.root.clone(), |path, seg| path.join(seg));
        Ok(Arc::new(DirCache {
            namespace: namespace.to_string(),
            dir,
            tmp_counter: AtomicU64::new(0),
        }))
    }
}

/// Client view of one namespace directory.
pub struct DirCache {
    namespace: String,
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl DirCache {
    /// Path of the entry file for `key`.
    ///
    /// Keys are restricted to ASCII alphanumerics, `-` and `_`.
    pub fn entry_path(&self, key: &str) -> CacheResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        let shard = &key[..key.len().min(2)];
        Ok(self.dir.join(shard).join(format!("{}.json", key)))
    }
}

#[async_trait]
impl CacheClient for DirCache {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let path = self.entry_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        if entry.key != key {
            tracing::warn!(
                path = %path.display(),
                stored = %entry.key,
                "cache entry key mismatch, treating as miss"
            );
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: &Value) -> CacheResult<()> {
        let path = self.entry_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entry = CacheEntry {
            key: key.to_string(),
            namespace: self.namespace.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            value: value.clone(),
        };
        let content = serde_json::to_vec_pretty(&entry)?;

        let seq = self.tmp_counter.fetch_add(1, Ordering::SeqCst);
        let tmp = path.with_extension(format!("json.tmp-{}-{}", std::process::id(), seq));
        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
