//! Source files as seen by plugins
//!
//! A [`FileTask`] lives for the whole build. It owns the file's content
//! (loaded lazily and then shared) and the [`FileExecutionQueue`] that keeps
//! plugin runs against the file from overlapping inside one process.

mod queue;
mod set;

pub use queue::FileExecutionQueue;
pub use set::FileSet;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;

/// File result type
pub type FileResult<T> = Result<T, FileError>;

/// Errors from reading file content
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

/// One source file tracked by the build.
pub struct FileTask {
    path: PathBuf,
    content: OnceCell<Arc<[u8]>>,
    queue: FileExecutionQueue,
}

impl FileTask {
    /// A file whose content is read from disk on first access.
    pub fn from_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: OnceCell::new(),
            queue: FileExecutionQueue::new(),
        }
    }

    /// A file whose content is already known.
    pub fn in_memory(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = Arc::from(content.into());
        Self {
            path: path.into(),
            content: OnceCell::new_with(Some(bytes)),
            queue: FileExecutionQueue::new(),
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as a string, as carried on the wire.
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Raw content bytes.
    pub async fn content(&self) -> FileResult<Arc<[u8]>> {
        let bytes = self
            .content
            .get_or_try_init(|| async {
                tokio::fs::read(&self.path)
                    .await
                    .map(Arc::from)
                    .map_err(|source| FileError::Read {
                        path: self.path.clone(),
                        source,
                    })
            })
            .await?;
        Ok(Arc::clone(bytes))
    }

    /// Content decoded as UTF-8.
    pub async fn content_string(&self) -> FileResult<String> {
        let bytes = self.content().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FileError::NotUtf8 {
            path: self.path.clone(),
        })
    }

    /// SHA-256 hex digest of the content.
    pub async fn content_digest(&self) -> FileResult<String> {
        let bytes = self.content().await?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// The execution queue owned by this file.
    pub fn queue(&self) -> &FileExecutionQueue {
        &self.queue
    }

    /// Run `factory`'s future once every earlier run on this file has settled.
    pub async fn run_exclusive<F, Fut>(&self, label: &str, factory: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.queue.run(label, factory).await
    }
}

impl std::fmt::Debug for FileTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTask")
            .field("path", &self.path)
            .field("loaded", &self.content.initialized())
            .finish()
    }
}
