//! Resume planning from a persisted "last completed directory" marker.
//!
//! # Policy
//!
//! Listing order is the sorted file-name order the walker uses. When the
//! marker lies strictly below a directory `D`, the planner finds the child
//! `C` of `D` that the marker descended into. Then:
//!
//! - children sorting before `C` were completed by the previous run and are
//!   skipped, but only if their modification time is provably older than the
//!   instant the checkpointed scan started. A newer or unreadable mtime, or an
//!   unknown start instant, means the child is walked again;
//! - if the marker is `C` itself, `C` was completed and is treated like the
//!   earlier children;
//! - otherwise `C` was only partially done and is walked again, as is every
//!   child after it.
//!
//! A marker equal to `D` itself, or outside `D`, skips nothing.
//!
//! Only the directory's own mtime is checked, so a change deep inside an
//! otherwise untouched sibling is not detected.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use super::fs::FileSystem;

/// Which child directories to walk and which to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildPlan {
    /// Children to walk, in listing order
    pub visit: Vec<PathBuf>,
    /// Children skipped as already complete and unchanged
    pub skip: Vec<PathBuf>,
}

/// Decides which children of a directory need walking on resume.
#[derive(Debug, Clone, Default)]
pub struct ResumePlanner {
    /// Marker from the previous run
    marker: Option<PathBuf>,
    /// Directories modified before this instant are considered unchanged
    unchanged_before: Option<SystemTime>,
}

impl ResumePlanner {
    /// A planner for a fresh scan: every child is visited.
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    /// A planner resuming after `marker`.
    ///
    /// `unchanged_before` is the instant the checkpointed scan started;
    /// `None` forces every earlier sibling to be re-checked by walking it.
    #[must_use]
    pub fn new(marker: PathBuf, unchanged_before: Option<SystemTime>) -> Self {
        Self {
            marker: Some(marker),
            unchanged_before,
        }
    }

    /// The marker this planner resumes from.
    #[must_use]
    pub fn marker(&self) -> Option<&Path> {
        self.marker.as_deref()
    }

    /// The child of `dir` that the marker descended into.
    ///
    /// Returns `None` when the marker is absent, equal to `dir`, or outside
    /// `dir`'s subtree. Comparison is by path components, so `/a/bc` is not
    /// considered to lie under `/a/b`.
    #[must_use]
    pub fn marker_child(&self, dir: &Path) -> Option<PathBuf> {
        let rest = self.marker.as_deref()?.strip_prefix(dir).ok()?;
        match rest.components().next()? {
            Component::Normal(name) => Some(dir.join(name)),
            _ => None,
        }
    }

    /// Split the sorted child directories of `dir` into visit and skip lists.
    pub fn plan<F: FileSystem + ?Sized>(
        &self,
        fs: &F,
        dir: &Path,
        children: Vec<PathBuf>,
    ) -> ChildPlan {
        let Some(pivot) = self.marker_child(dir) else {
            return ChildPlan {
                visit: children,
                skip: Vec::new(),
            };
        };

        let pivot_complete = self.marker.as_deref() == Some(pivot.as_path());

        let mut plan = ChildPlan::default();
        for child in children {
            let completed = match listing_order(&child, &pivot) {
                Ordering::Less => true,
                Ordering::Equal => pivot_complete,
                Ordering::Greater => false,
            };
            if completed && self.is_unchanged(fs, &child) {
                log::trace!("Resume: skipping completed {}", child.display());
                plan.skip.push(child);
            } else {
                plan.visit.push(child);
            }
        }
        plan
    }

    fn is_unchanged<F: FileSystem + ?Sized>(&self, fs: &F, dir: &Path) -> bool {
        let Some(threshold) = self.unchanged_before else {
            return false;
        };
        match fs.modified(dir) {
            Ok(modified) => modified < threshold,
            Err(e) => {
                log::debug!("Resume: treating {} as changed: {}", dir.display(), e);
                false
            }
        }
    }
}

/// Ordering of two entries as listed by the walker.
pub(crate) fn listing_order(a: &Path, b: &Path) -> Ordering {
    a.file_name().cmp(&b.file_name())
}
