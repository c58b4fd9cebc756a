//! Invocation errors and exit code mapping

use relay_cache::CacheError;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterError;
use crate::file::FileError;
use crate::key::KeyError;
use crate::plugin::PluginError;

/// Errors surfaced by a plugin invocation.
///
/// Nothing is retried locally: every error propagates to the caller, and a
/// batch fails as soon as one of its files does.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("cache access failed: {0}")]
    Cache(#[from] CacheError),

    #[error("cluster dispatch failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Failure category, with a stable process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Missing collaborators or invalid settings (exit code 10)
    Configuration = 10,
    /// Master/worker transport failure (exit code 20)
    Cluster = 20,
    /// Source file could not be read (exit code 30)
    File = 30,
    /// Plugin code failed (exit code 40)
    Plugin = 40,
    /// Cache backend failure (exit code 50)
    Cache = 50,
}

impl FailureKind {
    pub fn exit_code(&self) -> i32 {
        *self as i32
    }
}

impl InvokeError {
    /// Map error to failure kind for exit code
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            InvokeError::Configuration(_) => FailureKind::Configuration,
            InvokeError::Plugin(PluginError::File(_)) => FailureKind::File,
            InvokeError::Plugin(_) => FailureKind::Plugin,
            InvokeError::Cache(_) => FailureKind::Cache,
            InvokeError::Cluster(_) => FailureKind::Cluster,
            InvokeError::File(_) => FailureKind::File,
            InvokeError::Key(KeyError::File(_)) => FailureKind::File,
            InvokeError::Key(KeyError::Canonicalize(_)) => FailureKind::Configuration,
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.failure_kind().exit_code()
    }
}

/// Result type for invocations
pub type InvokeResult<T> = Result<T, InvokeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_failure_kinds() {
        let err = InvokeError::Configuration("no cache registry".to_string());
        assert_eq!(err.failure_kind(), FailureKind::Configuration);
        assert_eq!(err.exit_code(), 10);

        let err = InvokeError::from(PluginError::failed("uglify", "boom"));
        assert_eq!(err.exit_code(), 40);

        let missing = FileError::NotUtf8 {
            path: PathBuf::from("a.bin"),
        };
        let err = InvokeError::from(PluginError::from(missing));
        assert_eq!(err.failure_kind(), FailureKind::File);

        let err = InvokeError::from(CacheError::Backend("disk full".to_string()));
        assert_eq!(err.failure_kind(), FailureKind::Cache);
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::Cluster).unwrap();
        assert_eq!(json, "\"CLUSTER\"");
    }
}
