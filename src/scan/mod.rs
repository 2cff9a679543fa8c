//! Scan orchestration.
//!
//! [`Scanner::run`] ties the pieces together:
//!
//! 1. Roots are validated, canonicalized and de-nested.
//! 2. The checkpoint, if any, is loaded. A missing, corrupt or completed
//!    checkpoint means a fresh start; otherwise its index, counters and
//!    marker seed the run.
//! 3. One worker per root walks in parallel on a dedicated rayon pool, all
//!    feeding one [`SharedScan`]. The calling thread autosaves meanwhile.
//! 4. On cancellation the state is checkpointed for the next run; on
//!    completion a final checkpoint marked complete is written.

pub mod state;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::checkpoint::{Checkpoint, CheckpointStore, LoadError};
use crate::progress::{NoProgress, ProgressSink, ProgressSnapshot};
use crate::scanner::{
    FileSystem, FsError, LocalFs, ResumePlanner, ScanError, TreeWalker, WalkOutcome,
};
use crate::signal::CancelToken;

pub use state::{ScanState, SharedScan};

/// How often the supervising thread checks whether an autosave is due.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Seed the run from an existing checkpoint.
    pub resume: bool,
    /// Write a checkpoint marked complete when every root finishes.
    pub save_on_complete: bool,
    /// Checkpoint periodically while walking. `None` disables autosave.
    pub autosave_interval: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            resume: true,
            save_on_complete: true,
            autosave_interval: None,
        }
    }
}

impl ScanConfig {
    /// Enable or disable resuming from a checkpoint.
    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Enable or disable the final checkpoint of a completed scan.
    #[must_use]
    pub fn with_save_on_complete(mut self, save: bool) -> Self {
        self.save_on_complete = save;
        self
    }

    /// Set the autosave interval. A zero interval disables autosave.
    #[must_use]
    pub fn with_autosave(mut self, interval: Duration) -> Self {
        self.autosave_interval = (!interval.is_zero()).then_some(interval);
        self
    }
}

/// Result of a scan that did not fail.
#[derive(Debug)]
pub struct ScanReport {
    /// Whether every root was walked to the end
    pub outcome: WalkOutcome,
    /// Final index, counters and marker
    pub state: ScanState,
    /// Canonical roots that were walked
    pub roots: Vec<PathBuf>,
    /// Whether the run was seeded from a checkpoint
    pub resumed: bool,
    /// Whether a checkpoint was written when the scan stopped
    pub checkpoint_saved: bool,
}

impl ScanReport {
    /// Whether the scan covered every root.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == WalkOutcome::Completed
    }

    /// Final counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }
}

/// Runs resumable scans over a set of roots.
pub struct Scanner {
    config: ScanConfig,
    store: Option<CheckpointStore>,
    cancel: CancelToken,
    progress: Arc<dyn ProgressSink>,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Scanner over the local filesystem with no checkpoint store.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            store: None,
            cancel: CancelToken::new(),
            progress: Arc::new(NoProgress),
            fs: Arc::new(LocalFs),
        }
    }

    /// Persist progress in `store`.
    #[must_use]
    pub fn with_checkpoint_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Stop walking when `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Walk through `fs` instead of the local filesystem.
    #[must_use]
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Scan `roots` to completion or until cancelled.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NoRoots`], [`ScanError::RootNotFound`],
    ///   [`ScanError::NotADirectory`] for invalid roots
    /// - [`ScanError::CancelledBeforeStart`] if the token was already
    ///   cancelled; no checkpoint is written
    /// - [`ScanError::Root`] if a root cannot be listed
    /// - [`ScanError::Checkpoint`] if an interrupted scan cannot be
    ///   checkpointed. A completed scan only logs a failed final save.
    pub fn run(&self, roots: &[PathBuf]) -> Result<ScanReport, ScanError> {
        let roots = normalize_roots(roots)?;
        if self.cancel.is_cancelled() {
            return Err(ScanError::CancelledBeforeStart);
        }

        let seed = self.load_seed(&roots);
        let resumed = seed.is_some();
        let (state, planner, started_at) = match seed {
            Some(checkpoint) => {
                let planner = match checkpoint.marker.clone() {
                    Some(marker) => ResumePlanner::new(marker, checkpoint.unchanged_before()),
                    None => ResumePlanner::fresh(),
                };
                let started_at = checkpoint.scan_started_at;
                (checkpoint.into_state(), planner, started_at)
            }
            None => (ScanState::new(), ResumePlanner::fresh(), Some(Utc::now())),
        };

        if let Some(marker) = planner.marker() {
            log::info!("Resuming after {}", marker.display());
        }
        log::info!("Scanning {} root(s)", roots.len());

        let shared = SharedScan::new(state);
        let outcome = self.walk_roots(&roots, &shared, &planner, started_at)?;

        let state = shared.into_inner();
        let snapshot = state.snapshot();
        self.progress.on_scan_finished(&snapshot);
        log::info!("{}", snapshot.summary());

        let complete = outcome == WalkOutcome::Completed;
        let checkpoint_saved = match &self.store {
            Some(store) if !complete => {
                let checkpoint = Checkpoint::new(state.clone(), roots.clone(), started_at, false);
                store.save(&checkpoint)?;
                log::info!("Checkpoint written to {}", store.path().display());
                true
            }
            Some(store) if self.config.save_on_complete => {
                let checkpoint = Checkpoint::new(state.clone(), roots.clone(), started_at, true);
                match store.save(&checkpoint) {
                    Ok(()) => {
                        log::info!("Checkpoint written to {}", store.path().display());
                        true
                    }
                    Err(e) => {
                        log::error!("Scan completed; final checkpoint not written: {}", e);
                        false
                    }
                }
            }
            Some(store) => {
                if let Err(e) = store.clear() {
                    log::error!("Scan completed; stale checkpoint not removed: {}", e);
                }
                false
            }
            None => false,
        };

        Ok(ScanReport {
            outcome,
            state,
            roots,
            resumed,
            checkpoint_saved,
        })
    }

    /// Checkpoint to resume from, if there is a usable one.
    fn load_seed(&self, roots: &[PathBuf]) -> Option<Checkpoint> {
        let store = self.store.as_ref().filter(|_| self.config.resume)?;

        match store.load() {
            Ok(checkpoint) if checkpoint.complete => {
                log::info!("Previous scan completed; starting a fresh scan");
                None
            }
            Ok(checkpoint) if checkpoint.roots != roots => {
                log::warn!("Checkpoint was taken over different roots; starting a fresh scan");
                None
            }
            Ok(checkpoint) => Some(checkpoint),
            Err(LoadError::NotFound(path)) => {
                log::debug!("No checkpoint at {}", path.display());
                None
            }
            Err(e) => {
                log::warn!("{}; starting a fresh scan", e);
                None
            }
        }
    }

    /// Run one worker per root while autosaving from the calling thread.
    fn walk_roots(
        &self,
        roots: &[PathBuf],
        shared: &SharedScan,
        planner: &ResumePlanner,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<WalkOutcome, ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(roots.len())
            .thread_name(|i| format!("dupescan-walk-{i}"))
            .build()?;

        let results = thread::scope(|scope| {
            let workers = scope.spawn(|| {
                pool.install(|| {
                    roots
                        .par_iter()
                        .map(|root| self.walk_root(root, shared, planner))
                        .collect::<Vec<_>>()
                })
            });

            if let Some(interval) = self.config.autosave_interval {
                let mut last_save = Instant::now();
                while !workers.is_finished() {
                    thread::sleep(POLL_INTERVAL);
                    if last_save.elapsed() >= interval {
                        self.autosave(shared, roots, started_at);
                        last_save = Instant::now();
                    }
                }
            }

            workers.join().unwrap_or_else(|_| {
                roots
                    .iter()
                    .map(|root| Err(ScanError::WorkerPanicked(root.clone())))
                    .collect()
            })
        });

        let mut outcome = WalkOutcome::Completed;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(WalkOutcome::Completed) => {}
                Ok(WalkOutcome::Cancelled) => outcome = WalkOutcome::Cancelled,
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log::error!("{}", e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    fn walk_root(
        &self,
        root: &Path,
        shared: &SharedScan,
        planner: &ResumePlanner,
    ) -> Result<WalkOutcome, ScanError> {
        let walker = TreeWalker::new(&*self.fs, shared, planner, &self.cancel, &*self.progress);
        panic::catch_unwind(AssertUnwindSafe(|| walker.walk(root)))
            .unwrap_or_else(|_| Err(ScanError::WorkerPanicked(root.to_path_buf())))
    }

    fn autosave(
        &self,
        shared: &SharedScan,
        roots: &[PathBuf],
        started_at: Option<DateTime<Utc>>,
    ) {
        let Some(store) = &self.store else {
            return;
        };
        let checkpoint = shared
            .with_state(|state| Checkpoint::new(state.clone(), roots.to_vec(), started_at, false));
        match store.save(&checkpoint) {
            Ok(()) => log::debug!("Autosaved {} files", checkpoint.index.counters().total_files),
            Err(e) => log::error!("Autosave failed: {}", e),
        }
    }
}

/// Canonicalize roots, reject invalid ones and drop roots nested in others.
///
/// # Errors
///
/// Returns [`ScanError::NoRoots`] for an empty list, and
/// [`ScanError::RootNotFound`], [`ScanError::NotADirectory`] or
/// [`ScanError::Root`] for the first root that cannot be used.
pub fn normalize_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    if roots.is_empty() {
        return Err(ScanError::NoRoots);
    }

    let mut canonical = Vec::with_capacity(roots.len());
    for root in roots {
        let path = root.canonicalize().map_err(|e| match FsError::from_io(root, e) {
            FsError::NotFound(path) => ScanError::RootNotFound(path),
            source => ScanError::Root {
                path: root.clone(),
                source,
            },
        })?;
        if !path.is_dir() {
            return Err(ScanError::NotADirectory(root.clone()));
        }
        canonical.push(path);
    }

    canonical.sort();
    canonical.dedup();

    // Sorted, so any ancestor of a root precedes it.
    let mut kept: Vec<PathBuf> = Vec::with_capacity(canonical.len());
    for path in canonical {
        match kept.iter().find(|parent| path.starts_with(parent)) {
            Some(parent) => log::warn!(
                "Skipping {}: already covered by {}",
                path.display(),
                parent.display()
            ),
            None => kept.push(path),
        }
    }
    Ok(kept)
}
