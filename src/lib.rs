//! dupescan - Resumable Duplicate File Scanner
//!
//! Walks one or more directory trees and groups regular files that share a
//! base name and a byte size. Progress is checkpointed so an interrupted scan
//! of a very large tree picks up where it stopped instead of starting over.
//!
//! # Architecture
//!
//! - [`duplicates`]: the `(name, size)` key and the duplicate index with its
//!   running counters
//! - [`scanner`]: filesystem access, the depth-first walker and the resume
//!   planner
//! - [`scan`]: shared scan state and the orchestrator running one worker
//!   per root
//! - [`checkpoint`]: atomic, checksummed persistence of the scan state
//! - [`progress`], [`signal`], [`config`], [`logging`], [`error`], [`cli`]:
//!   the application shell

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scan;
pub mod scanner;
pub mod signal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytesize::ByteSize;

use crate::checkpoint::{CheckpointStore, LoadError};
use crate::cli::{CheckpointArgs, Cli, Commands, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::progress::TerminalProgress;
use crate::scan::{ScanConfig, ScanReport, Scanner};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for anything that should end the process with a
/// non-zero status other than a checkpointed interruption, which is reported
/// as [`ExitCode::Interrupted`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet) {
        log::debug!("Logger already installed: {}", e);
    }

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet),
        Commands::Status(args) => run_status(args),
        Commands::Reset(args) => run_reset(args, cli.quiet),
    }
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let store = checkpoint_store(args.checkpoint.path, &config)?;

    let autosave = match args.autosave {
        Some(secs) => Duration::from_secs(secs),
        None => config.autosave_interval().unwrap_or(Duration::ZERO),
    };
    let scan_config = ScanConfig::default()
        .with_resume(config.resume && !args.fresh)
        .with_save_on_complete(!args.no_save)
        .with_autosave(autosave);

    let cancel = signal::install_handler().context("Failed to install signal handler")?;
    let progress = Arc::new(TerminalProgress::new(
        quiet || args.no_progress || !config.progress,
    ));

    let report = Scanner::new(scan_config)
        .with_checkpoint_store(store.clone())
        .with_cancel_token(cancel)
        .with_progress(progress)
        .run(&args.roots)?;

    if !quiet {
        print_report(&report);
    }

    if report.is_complete() {
        Ok(ExitCode::Success)
    } else {
        log::info!(
            "Interrupted; progress saved to {}. Run the same command again to resume.",
            store.path().display()
        );
        Ok(ExitCode::Interrupted)
    }
}

fn print_report(report: &ScanReport) {
    let snapshot = report.snapshot();
    let status = if report.is_complete() {
        "complete"
    } else {
        "interrupted"
    };

    println!("Scan {} ({} root(s))", status, report.roots.len());
    println!("  Total files:  {}", snapshot.total_files);
    println!("  Duplicates:   {}", snapshot.duplicate_count);
    println!("  Space wasted: {}", ByteSize(snapshot.bytes_wasted));
    if report.resumed {
        println!("  Resumed from checkpoint");
    }
}

fn run_status(args: CheckpointArgs) -> Result<ExitCode> {
    let config = Config::load(None).context("Failed to load configuration")?;
    let store = checkpoint_store(args.path, &config)?;

    let checkpoint = match store.load() {
        Ok(checkpoint) => checkpoint,
        Err(LoadError::NotFound(path)) => {
            println!("No checkpoint at {}", path.display());
            return Ok(ExitCode::Success);
        }
        Err(e) => return Err(e).context("Failed to read checkpoint"),
    };

    let counters = checkpoint.index.counters();
    println!("Checkpoint:   {}", store.path().display());
    println!("Saved at:     {}", checkpoint.saved_at.to_rfc3339());
    println!(
        "State:        {}",
        if checkpoint.complete {
            "complete"
        } else {
            "resumable"
        }
    );
    for root in &checkpoint.roots {
        println!("Root:         {}", root.display());
    }
    if let Some(marker) = &checkpoint.marker {
        println!("Last dir:     {}", marker.display());
    }
    println!("Total files:  {}", counters.total_files);
    println!("Duplicates:   {}", counters.duplicate_count);
    println!("Space wasted: {}", ByteSize(counters.bytes_wasted));
    Ok(ExitCode::Success)
}

fn run_reset(args: CheckpointArgs, quiet: bool) -> Result<ExitCode> {
    let config = Config::load(None).context("Failed to load configuration")?;
    let store = checkpoint_store(args.path, &config)?;
    store.clear().context("Failed to remove checkpoint")?;
    if !quiet {
        println!("Removed checkpoint {}", store.path().display());
    }
    Ok(ExitCode::Success)
}

/// Store at `path`, else the configured location, else the cache directory.
fn checkpoint_store(path: Option<PathBuf>, config: &Config) -> Result<CheckpointStore> {
    let path = match path.or_else(|| config.checkpoint_path.clone()) {
        Some(path) => path,
        None => checkpoint::default_checkpoint_path()?,
    };
    Ok(CheckpointStore::new(path))
}
