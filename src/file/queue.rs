//! Per-file execution queue
//!
//! Serializes every plugin run requested against one file within a process.
//! Runs start in submission order and never overlap: a run waits until the
//! one queued before it has settled, whether it succeeded or failed.
//!
//! The gate is a `tokio::sync::Mutex`, whose waiters are woken in FIFO order.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Mutex;

/// FIFO, non-overlapping run queue owned by a [`super::FileTask`].
#[derive(Debug, Default)]
pub struct FileExecutionQueue {
    gate: Mutex<()>,
    pending: AtomicUsize,
    completed: AtomicU64,
}

/// Decrements the pending count even if the waiting future is dropped.
struct PendingSlot<'a> {
    queue: &'a FileExecutionQueue,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.queue.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FileExecutionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a run. `factory` is not called until every earlier run has settled.
    pub async fn run<F, Fut>(&self, label: &str, factory: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _slot = PendingSlot { queue: self };

        let _turn = self.gate.lock().await;
        tracing::trace!(label, "file queue turn");

        let output = factory().await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        output
    }

    /// Runs queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Runs that have settled.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}
