//! Progress reporting.
//!
//! The walker hands a [`ProgressSnapshot`] to a [`ProgressSink`] each time a
//! directory completes. The core makes no assumption about rendering;
//! [`TerminalProgress`] is the indicatif-backed sink used by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::duplicates::AggregateCounters;

/// Read-only view of the scan taken atomically with the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Bytes occupied by the extra copies seen so far
    pub bytes_wasted: u64,
    /// Number of extra copies seen so far
    pub duplicate_count: u64,
    /// Regular files indexed so far
    pub total_files: u64,
    /// Most recently completed directory
    pub current_path: Option<PathBuf>,
}

impl ProgressSnapshot {
    /// Build a snapshot from counters and the current marker.
    #[must_use]
    pub fn new(counters: AggregateCounters, current_path: Option<&Path>) -> Self {
        Self {
            bytes_wasted: counters.bytes_wasted,
            duplicate_count: counters.duplicate_count,
            total_files: counters.total_files,
            current_path: current_path.map(Path::to_path_buf),
        }
    }

    /// One-line human summary of the counters.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Space wasted: {}  Duplicates: {}  Total files: {}",
            ByteSize(self.bytes_wasted),
            self.duplicate_count,
            self.total_files
        )
    }
}

/// Receiver of progress observations.
///
/// Called from worker threads, so implementations must be thread-safe.
pub trait ProgressSink: Send + Sync {
    /// A directory and all of its children have been visited.
    fn on_directory_complete(&self, snapshot: &ProgressSnapshot);

    /// The scan has stopped, either complete or interrupted.
    fn on_scan_finished(&self, _snapshot: &ProgressSnapshot) {}
}

/// Sink that ignores every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_directory_complete(&self, _snapshot: &ProgressSnapshot) {}
}

/// Spinner on stderr showing live waste statistics and the current path.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    /// Create a terminal reporter. A hidden reporter draws nothing.
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] {prefix}\n  {wide_msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_prefix(ProgressSnapshot::default().summary());
        Self { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn on_directory_complete(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_prefix(snapshot.summary());
        if let Some(path) = &snapshot.current_path {
            self.bar.set_message(path.display().to_string());
        }
        self.bar.tick();
    }

    fn on_scan_finished(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_prefix(snapshot.summary());
        self.bar.finish_and_clear();
    }
}
