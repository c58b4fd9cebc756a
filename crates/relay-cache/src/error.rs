//! Error types for cache operations.

use thiserror::Error;

/// Cache result type
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid cache namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}
