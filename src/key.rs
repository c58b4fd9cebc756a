//! Cache key computation
//!
//! A cache key identifies one plugin computation: the plugin's definition, its
//! resolved options and the file content. Inputs are serialized with RFC 8785
//! JSON Canonicalization (JCS) and hashed with SHA-256, so option key order
//! never affects the key.
//!
//! The same digest doubles as the dedup claim key exchanged between workers
//! and the master.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::file::{FileError, FileTask};

/// Errors from key computation
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to canonicalize key inputs: {0}")]
    Canonicalize(String),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Canonical inputs to a cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheKeyInputs<'a> {
    /// Plugin definition string
    pub plugin: &'a str,
    /// Resolved plugin options
    pub options: &'a Value,
    /// SHA-256 hex digest of the file content
    pub content_sha256: &'a str,
}

impl CacheKeyInputs<'_> {
    /// key = SHA-256 hex digest of JCS(inputs)
    pub fn compute(&self) -> Result<CacheKey, KeyError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(self)
            .map_err(|e| KeyError::Canonicalize(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(CacheKey(hex::encode(hasher.finalize())))
    }
}

/// Hex-encoded SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `file` under a plugin definition and options.
    pub async fn for_file(
        definition: &str,
        options: &Value,
        file: &FileTask,
    ) -> Result<Self, KeyError> {
        let content_sha256 = file.content_digest().await?;
        CacheKeyInputs {
            plugin: definition,
            options,
            content_sha256: &content_sha256,
        }
        .compute()
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
