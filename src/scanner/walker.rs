//! Depth-first tree walker feeding the duplicate index.
//!
//! # Overview
//!
//! [`TreeWalker::walk`] visits every entry under a root in pre-order,
//! children sorted by file name so that the order is the same on every run.
//!
//! - Directories: the cancel token is checked first, then the walker
//!   recurses. When the recursive call completes, the directory becomes the
//!   resume marker and a progress snapshot is emitted. A permission failure
//!   skips the subtree quietly; any other failure is logged and the walk
//!   continues with the next sibling.
//! - Regular files: recorded under `(basename, size)`, with the size taken
//!   from the same metadata read that classified the entry. Entries that
//!   vanish before they can be classified are skipped.
//! - Everything else (symbolic links, sockets, devices) is ignored. Links are
//!   never followed, so the walk cannot cycle.
//!
//! Only failure to list the root itself is returned to the caller.

use std::path::{Path, PathBuf};

use super::fs::{EntryKind, FileSystem};
use super::resume::{listing_order, ResumePlanner};
use super::{FsError, ScanError};
use crate::duplicates::FileKey;
use crate::progress::ProgressSink;
use crate::scan::SharedScan;
use crate::signal::CancelToken;

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every reachable entry was visited.
    Completed,
    /// The cancel token was observed; the walk unwound early.
    Cancelled,
}

/// Recursive walker over one root, sharing state with other workers.
pub struct TreeWalker<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    state: &'a SharedScan,
    planner: &'a ResumePlanner,
    cancel: &'a CancelToken,
    progress: &'a dyn ProgressSink,
}

impl<'a, F: FileSystem + ?Sized> TreeWalker<'a, F> {
    /// Create a walker.
    #[must_use]
    pub fn new(
        fs: &'a F,
        state: &'a SharedScan,
        planner: &'a ResumePlanner,
        cancel: &'a CancelToken,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            fs,
            state,
            planner,
            cancel,
            progress,
        }
    }

    /// Walk `root`, which must be an absolute directory path.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Root`] if `root` itself cannot be listed.
    pub fn walk(&self, root: &Path) -> Result<WalkOutcome, ScanError> {
        log::debug!("Walking {}", root.display());
        self.walk_dir(root).map_err(|source| ScanError::Root {
            path: root.to_path_buf(),
            source,
        })
    }

    fn walk_dir(&self, dir: &Path) -> Result<WalkOutcome, FsError> {
        let mut entries = self.classify_children(dir)?;
        entries.sort_by(|(a, _), (b, _)| listing_order(a, b));

        let subdirs = entries
            .iter()
            .filter(|(_, kind)| *kind == EntryKind::Directory)
            .map(|(path, _)| path.clone())
            .collect();
        let skip = self.planner.plan(self.fs, dir, subdirs).skip;

        for (path, kind) in entries {
            match kind {
                EntryKind::Directory => {
                    if skip.contains(&path) {
                        continue;
                    }
                    if self.cancel.is_cancelled() {
                        log::debug!("Cancelled before entering {}", path.display());
                        return Ok(WalkOutcome::Cancelled);
                    }
                    if self.descend(&path) == WalkOutcome::Cancelled {
                        return Ok(WalkOutcome::Cancelled);
                    }
                }
                EntryKind::File(size) => self.index_file(&path, size),
                EntryKind::Other => {
                    log::trace!("Skipping special file: {}", path.display());
                }
            }
        }

        Ok(WalkOutcome::Completed)
    }

    /// Walk one child directory; errors stop at this boundary.
    fn descend(&self, dir: &Path) -> WalkOutcome {
        match self.walk_dir(dir) {
            Ok(WalkOutcome::Completed) => {
                let snapshot = self.state.complete_directory(dir);
                self.progress.on_directory_complete(&snapshot);
                WalkOutcome::Completed
            }
            Ok(WalkOutcome::Cancelled) => WalkOutcome::Cancelled,
            Err(e) if e.is_permission_denied() => {
                log::debug!("Skipping inaccessible directory: {}", dir.display());
                WalkOutcome::Completed
            }
            Err(e) => {
                log::warn!("Skipping directory after error: {}", e);
                WalkOutcome::Completed
            }
        }
    }

    fn classify_children(&self, dir: &Path) -> Result<Vec<(PathBuf, EntryKind)>, FsError> {
        let children = self.fs.list_dir(dir)?;
        let mut classified = Vec::with_capacity(children.len());

        for path in children {
            match self.fs.classify(&path) {
                Ok(kind) => classified.push((path, kind)),
                Err(e) => log::debug!("Skipping unclassifiable entry: {}", e),
            }
        }
        Ok(classified)
    }

    fn index_file(&self, path: &Path, size: u64) {
        let key = FileKey::from_path(path, size);
        let observation = self
            .state
            .observe(key, path.to_string_lossy().into_owned());
        log::trace!("{:?}: {}", observation, path.display());
    }
}
