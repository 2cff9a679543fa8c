//! Path classification and metadata queries.
//!
//! The walker never touches `std::fs` directly; it goes through
//! [`FileSystem`] so that tests can count calls or inject failures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::FsError;

/// What kind of entry a path is, without following symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory to recurse into
    Directory,
    /// A regular file to index, with its size in bytes
    File(u64),
    /// Symbolic links, sockets, devices, FIFOs: neither recursed nor indexed
    Other,
}

/// Filesystem access used by the walker and the resume planner.
pub trait FileSystem: Send + Sync {
    /// List the entries of `dir` as full paths, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`FsError`] if the directory cannot be opened.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError>;

    /// Classify `path` without following symbolic links. Regular files
    /// carry their size from the same metadata read.
    ///
    /// # Errors
    ///
    /// Returns [`FsError`] if the entry cannot be stat'ed.
    fn classify(&self, path: &Path) -> Result<EntryKind, FsError>;

    /// Last modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError`] if the metadata cannot be read.
    fn modified(&self, path: &Path) -> Result<SystemTime, FsError>;
}

/// [`FileSystem`] backed by the local operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        let read_dir = fs::read_dir(dir).map_err(|e| FsError::from_io(dir, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(e) => {
                    log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                }
            }
        }
        Ok(entries)
    }

    fn classify(&self, path: &Path) -> Result<EntryKind, FsError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let file_type = metadata.file_type();

        Ok(if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File(metadata.len())
        } else {
            EntryKind::Other
        })
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, FsError> {
        fs::symlink_metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| FsError::from_io(path, e))
    }
}
