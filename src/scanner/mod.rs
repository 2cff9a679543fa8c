//! Resumable directory traversal.
//!
//! # Architecture
//!
//! - [`fs`]: path classification and metadata queries behind the
//!   [`FileSystem`] trait
//! - [`resume`]: decides which child directories may be skipped when a
//!   previous run left a resume marker
//! - [`walker`]: the depth-first walker that feeds files into the shared
//!   duplicate index
//!
//! # Example
//!
//! ```no_run
//! use dupescan::progress::NoProgress;
//! use dupescan::scan::SharedScan;
//! use dupescan::scanner::{LocalFs, ResumePlanner, TreeWalker};
//! use dupescan::signal::CancelToken;
//! use std::path::Path;
//!
//! let state = SharedScan::default();
//! let planner = ResumePlanner::fresh();
//! let cancel = CancelToken::new();
//!
//! let walker = TreeWalker::new(&LocalFs, &state, &planner, &cancel, &NoProgress);
//! walker.walk(Path::new("/data")).unwrap();
//!
//! println!("{:?}", state.snapshot());
//! ```

pub mod fs;
pub mod resume;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};

pub use fs::{EntryKind, FileSystem, LocalFs};
pub use resume::{ChildPlan, ResumePlanner};
pub use walker::{TreeWalker, WalkOutcome};

/// Errors from a single filesystem query.
///
/// The three variants keep "not found", "permission denied" and everything
/// else distinguishable, since the walker tolerates them differently.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path vanished or never existed.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an [`io::Error`] raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Whether this is a permission failure.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// The path the failed query was about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that stop a scan, or one root of it.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// No root directories were given.
    #[error("No directories to scan")]
    NoRoots,

    /// A root directory does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),

    /// A root path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cancellation was requested before any directory was read.
    #[error("Scan cancelled before it started")]
    CancelledBeforeStart,

    /// The root directory itself could not be read.
    #[error("Failed to scan {path}: {source}")]
    Root {
        /// Root being walked
        path: PathBuf,
        /// What went wrong
        #[source]
        source: FsError,
    },

    /// A worker thread panicked.
    #[error("Scan worker for {0} panicked")]
    WorkerPanicked(PathBuf),

    /// The worker thread pool could not be created.
    #[error("Failed to start scan workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Progress could not be persisted when the scan stopped.
    #[error(transparent)]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),
}
