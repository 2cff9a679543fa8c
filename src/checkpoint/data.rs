//! Checkpoint model and its persisted record.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duplicates::{AggregateCounters, DuplicateIndex, KeyDecodeError, PersistedIndex};
use crate::scan::ScanState;

/// Current version of the checkpoint file format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Slack subtracted from the scan start before comparing directory mtimes.
///
/// Filesystems stamp mtimes from a coarse kernel clock that can trail the
/// wall clock read at scan start, so a directory changed just after the
/// scan began may carry an mtime slightly before it.
pub const MTIME_SLACK: Duration = Duration::from_secs(2);

/// Durable snapshot of traversal progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Index and counters
    pub index: DuplicateIndex,
    /// Most recently completed directory
    pub marker: Option<PathBuf>,
    /// Roots of the scan that produced this checkpoint
    pub roots: Vec<PathBuf>,
    /// When the earliest run contributing to this checkpoint started
    pub scan_started_at: Option<DateTime<Utc>>,
    /// When the checkpoint was written
    pub saved_at: DateTime<Utc>,
    /// Whether the scan had finished every root
    pub complete: bool,
}

impl Checkpoint {
    /// Capture `state` as a checkpoint.
    ///
    /// `scan_started_at` is `None` when the start of the earliest
    /// contributing run is unknown.
    #[must_use]
    pub fn new(
        state: ScanState,
        roots: Vec<PathBuf>,
        scan_started_at: Option<DateTime<Utc>>,
        complete: bool,
    ) -> Self {
        Self {
            index: state.index,
            marker: state.marker,
            roots,
            scan_started_at,
            saved_at: Utc::now(),
            complete,
        }
    }

    /// Directories modified before this instant are unchanged since scanned.
    ///
    /// This is the scan start minus [`MTIME_SLACK`].
    #[must_use]
    pub fn unchanged_before(&self) -> Option<SystemTime> {
        self.scan_started_at
            .and_then(|started| SystemTime::from(started).checked_sub(MTIME_SLACK))
    }

    /// Split into the state a resumed scan starts from.
    #[must_use]
    pub fn into_state(self) -> ScanState {
        ScanState {
            index: self.index,
            marker: self.marker,
        }
    }
}

/// On-disk layout of a checkpoint.
///
/// Counters are optional so that files written without them still load;
/// they are then recomputed from `all_files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CheckpointRecord {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub scan_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub roots: Vec<String>,
    /// Resume marker
    #[serde(default)]
    pub current_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_wasted: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    pub all_files: PersistedIndex,
}

impl From<&Checkpoint> for CheckpointRecord {
    fn from(checkpoint: &Checkpoint) -> Self {
        let counters = checkpoint.index.counters();
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: checkpoint.saved_at,
            scan_started_at: checkpoint.scan_started_at,
            complete: checkpoint.complete,
            roots: checkpoint.roots.iter().map(|p| lossy(p)).collect(),
            current_dir: checkpoint.marker.as_deref().map(lossy),
            bytes_wasted: Some(counters.bytes_wasted),
            duplicates: Some(counters.duplicate_count),
            total_files: Some(counters.total_files),
            all_files: checkpoint.index.to_persisted(),
        }
    }
}

impl TryFrom<CheckpointRecord> for Checkpoint {
    type Error = KeyDecodeError;

    fn try_from(record: CheckpointRecord) -> Result<Self, Self::Error> {
        let index = match (record.total_files, record.duplicates, record.bytes_wasted) {
            (Some(total_files), Some(duplicate_count), Some(bytes_wasted)) => {
                DuplicateIndex::from_persisted_with_counters(
                    &record.all_files,
                    AggregateCounters {
                        total_files,
                        duplicate_count,
                        bytes_wasted,
                    },
                )?
            }
            _ => {
                log::debug!("Checkpoint has no counters, recomputing from index");
                DuplicateIndex::from_persisted(&record.all_files)?
            }
        };

        Ok(Self {
            index,
            marker: record.current_dir.map(PathBuf::from),
            roots: record.roots.into_iter().map(PathBuf::from).collect(),
            scan_started_at: record.scan_started_at,
            saved_at: record.saved_at,
            complete: record.complete,
        })
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
