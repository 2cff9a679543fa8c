//! Atomic checkpoint persistence.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::data::{Checkpoint, CheckpointRecord, CHECKPOINT_VERSION};

/// Default checkpoint file name inside the cache directory.
pub const CHECKPOINT_FILE_NAME: &str = "checkpoint.json";

/// Envelope adding an integrity check to the checkpoint record.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointEnvelope {
    /// SHA256 of the compact JSON of `checkpoint`
    checksum: String,
    checkpoint: CheckpointRecord,
}

/// Errors writing a checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// The checkpoint could not be serialized.
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The checkpoint file could not be written or replaced.
    #[error("Failed to write checkpoint {path}: {source}")]
    Write {
        /// Target checkpoint file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// No platform cache directory could be determined.
    #[error("Failed to determine a default checkpoint location")]
    NoDefaultLocation,
}

/// Errors reading a checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// No checkpoint exists; start fresh.
    #[error("No checkpoint at {0}")]
    NotFound(PathBuf),

    /// The file exists but does not hold a valid checkpoint.
    #[error("Checkpoint {path} is corrupt: {reason}")]
    Corrupt {
        /// Checkpoint file
        path: PathBuf,
        /// What failed validation
        reason: String,
    },

    /// The file exists but could not be read.
    #[error("Failed to read checkpoint {path}: {source}")]
    Io {
        /// Checkpoint file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Reads and writes one checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform cache location.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::NoDefaultLocation`] if the platform has no
    /// home/cache directory.
    pub fn at_default_location() -> Result<Self, CheckpointError> {
        Ok(Self::new(default_checkpoint_path()?))
    }

    /// The checkpoint file this store manages.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `checkpoint` atomically.
    ///
    /// The data goes to a temporary file in the same directory, is flushed
    /// to disk, and then renamed over the previous checkpoint. A crash at any
    /// point leaves either the old file or the new one.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if serialization or any filesystem step
    /// fails. The previous checkpoint, if any, is left untouched.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = to_json(checkpoint)?;
        let write_err = |source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::debug!(
            "Checkpoint saved to {} ({} groups)",
            self.path.display(),
            checkpoint.index.group_count()
        );
        Ok(())
    }

    /// Read and verify the checkpoint.
    ///
    /// # Errors
    ///
    /// - [`LoadError::NotFound`] if there is no checkpoint file
    /// - [`LoadError::Corrupt`] if it fails to parse, fails its checksum,
    ///   has an unsupported version, or contains undecodable keys
    /// - [`LoadError::Io`] if it exists but cannot be read
    pub fn load(&self) -> Result<Checkpoint, LoadError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound(self.path.clone())
            } else {
                LoadError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        from_json(&content).map_err(|reason| LoadError::Corrupt {
            path: self.path.clone(),
            reason,
        })
    }

    /// Delete the checkpoint file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Write`] if the file exists but cannot be
    /// removed.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Platform cache location for the checkpoint file.
///
/// # Errors
///
/// Returns [`CheckpointError::NoDefaultLocation`] if it cannot be determined.
pub fn default_checkpoint_path() -> Result<PathBuf, CheckpointError> {
    let dirs = ProjectDirs::from("com", "dupescan", "dupescan")
        .ok_or(CheckpointError::NoDefaultLocation)?;
    Ok(dirs.cache_dir().join(CHECKPOINT_FILE_NAME))
}

fn checksum(record: &CheckpointRecord) -> Result<String, serde_json::Error> {
    let compact = serde_json::to_string(record)?;
    Ok(format!("{:x}", Sha256::digest(compact.as_bytes())))
}

/// Serialize with an integrity envelope, pretty-printed for inspection.
fn to_json(checkpoint: &Checkpoint) -> Result<String, serde_json::Error> {
    let record = CheckpointRecord::from(checkpoint);
    let envelope = CheckpointEnvelope {
        checksum: checksum(&record)?,
        checkpoint: record,
    };
    serde_json::to_string_pretty(&envelope)
}

fn from_json(content: &str) -> Result<Checkpoint, String> {
    let envelope: CheckpointEnvelope =
        serde_json::from_str(content).map_err(|e| format!("unparseable checkpoint: {e}"))?;

    // Must match the compact serialization used by `to_json`.
    let expected = checksum(&envelope.checkpoint).map_err(|e| e.to_string())?;
    if expected != envelope.checksum {
        return Err("integrity check failed: checksum mismatch".to_string());
    }

    if envelope.checkpoint.version != CHECKPOINT_VERSION {
        return Err(format!(
            "unsupported checkpoint version {} (expected {})",
            envelope.checkpoint.version, CHECKPOINT_VERSION
        ));
    }

    Checkpoint::try_from(envelope.checkpoint).map_err(|e| e.to_string())
}
