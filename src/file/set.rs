//! Build-wide file arena keyed by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::FileTask;

/// Every [`FileTask`] known to one process, one per path.
///
/// Handing out the same task for the same path is what makes the per-file
/// queue effective across independent invocations.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Mutex<HashMap<PathBuf, Arc<FileTask>>>,
}

impl FileSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    // Writes are single map inserts; a poisoned map is still usable.
    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<FileTask>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task, replacing any previous task for the same path.
    pub fn insert(&self, task: FileTask) -> Arc<FileTask> {
        let task = Arc::new(task);
        self.files().insert(task.path().to_path_buf(), Arc::clone(&task));
        task
    }

    /// Look up a task by path.
    pub fn get(&self, path: &Path) -> Option<Arc<FileTask>> {
        self.files().get(path).cloned()
    }

    /// Look up a task, creating a disk-backed one on first use.
    pub fn get_or_load(&self, path: &Path) -> Arc<FileTask> {
        let mut files = self.files();
        Arc::clone(
            files
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(FileTask::from_disk(path))),
        )
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.files().len()
    }

    /// Whether no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
