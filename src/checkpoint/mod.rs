//! Crash-safe persistence of scan progress.
//!
//! A checkpoint holds the duplicate index, its counters and the resume
//! marker. It is written when a scan is interrupted, periodically while a
//! scan runs, and once more when the scan completes so the index is available
//! to report tooling.
//!
//! # Features
//!
//! * **Atomicity**: written to a temporary file and renamed into place.
//! * **Integrity**: wrapped in an envelope with a SHA256 checksum; a file
//!   that fails the check loads as [`LoadError::Corrupt`].
//! * **Versioning**: the record carries [`CHECKPOINT_VERSION`].
//!
//! # Architecture
//!
//! * [`data`]: the in-memory [`Checkpoint`] and its on-disk record.
//! * [`io`]: [`CheckpointStore`] for saving, loading and clearing.

pub mod data;
pub mod io;

pub use data::{Checkpoint, CHECKPOINT_VERSION};
pub use io::{
    default_checkpoint_path, CheckpointError, CheckpointStore, LoadError, CHECKPOINT_FILE_NAME,
};
