//! Relay result cache
//!
//! Namespaced key/value store for plugin outputs. The coordinator only sees
//! the [`CacheClient`] trait; two backends ship with the crate:
//!
//! - [`MemoryBackend`]: process-local map, used by tests and single-process builds
//! - [`DirBackend`]: one JSON entry per key under `<root>/<namespace>/`
//!
//! ## Namespaces
//!
//! Namespaces look like `<product>/<plugin>`. Each namespace gets its own
//! client instance, created lazily by [`CacheRegistry`] and shared by every
//! invocation of that plugin.

mod client;
mod dir;
mod error;
mod memory;
mod registry;

pub use client::{CacheBackend, CacheClient};
pub use dir::{CacheEntry, DirBackend, DirCache};
pub use error::{CacheError, CacheResult};
pub use memory::{CacheStats, MemoryBackend, MemoryCache};
pub use registry::CacheRegistry;

/// Validate a namespace of the form `segment/segment/...`.
///
/// Segments must be non-empty and must not be `.` or `..`.
pub fn validate_namespace(namespace: &str) -> CacheResult<()> {
    if namespace.is_empty() {
        return Err(CacheError::InvalidNamespace(namespace.to_string()));
    }
    let bad_segment = namespace
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'));
    if bad_segment {
        return Err(CacheError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}
