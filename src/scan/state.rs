//! Shared mutable scan state.
//!
//! Index, counters and resume marker live in one [`ScanState`] behind one
//! mutex. Every mutation and every read used for reporting or checkpointing
//! takes that lock, so a reader never sees a counter update without the
//! matching index update.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::duplicates::{DuplicateIndex, FileKey, Observation};
use crate::progress::ProgressSnapshot;

/// Everything a checkpoint captures about traversal progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Duplicate index, owning its running counters
    pub index: DuplicateIndex,
    /// Most recently completed directory
    pub marker: Option<PathBuf>,
}

impl ScanState {
    /// State for a scan with no prior progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for the progress reporter.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.index.counters(), self.marker.as_deref())
    }
}

/// [`ScanState`] shared by all traversal workers.
#[derive(Debug, Default)]
pub struct SharedScan {
    inner: Mutex<ScanState>,
}

impl SharedScan {
    /// Wrap `state` for sharing between workers.
    #[must_use]
    pub fn new(state: ScanState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Record one file in the index.
    pub fn observe(&self, key: FileKey, path: impl Into<String>) -> Observation {
        self.lock().index.observe(key, path)
    }

    /// Mark `dir` as completed and return a snapshot taken under the same lock.
    pub fn complete_directory(&self, dir: &Path) -> ProgressSnapshot {
        let mut state = self.lock();
        state.marker = Some(dir.to_path_buf());
        state.snapshot()
    }

    /// Current counters and marker.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` against a consistent view of the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&ScanState) -> R) -> R {
        f(&self.lock())
    }

    /// Take the state back once all workers are done.
    #[must_use]
    pub fn into_inner(self) -> ScanState {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    // A worker that panicked mid-update leaves the index itself intact
    // (each observe is a single map operation), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
