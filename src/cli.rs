//! Command-line interface definitions.
//!
//! ```bash
//! # Scan two trees, resuming a previous interrupted run if there is one
//! dupescan scan /srv/photos /mnt/backup
//!
//! # Ignore any checkpoint and keep nothing afterwards
//! dupescan scan --fresh --no-save ~/Downloads
//!
//! # Inspect or discard the stored checkpoint
//! dupescan status
//! dupescan reset
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Resumable duplicate file scanner.
///
/// Files are considered duplicates when they share a base name and a size.
/// An interrupted scan (Ctrl+C) is checkpointed and continues where it left
/// off the next time it is run.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for files sharing a name and size
    Scan(ScanArgs),
    /// Show the counters and resume point of the stored checkpoint
    Status(CheckpointArgs),
    /// Delete the stored checkpoint
    Reset(CheckpointArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root directories to scan
    #[arg(value_name = "ROOT", required = true, num_args = 1..)]
    pub roots: Vec<PathBuf>,

    #[command(flatten)]
    pub checkpoint: CheckpointArgs,

    /// Ignore any existing checkpoint and start from scratch
    #[arg(long)]
    pub fresh: bool,

    /// Do not keep a checkpoint once the scan completes
    ///
    /// An interrupted scan is still checkpointed so it can resume.
    #[arg(long)]
    pub no_save: bool,

    /// Seconds between checkpoints while scanning (0 disables)
    #[arg(long, value_name = "SECS")]
    pub autosave: Option<u64>,

    /// Do not draw the progress line
    #[arg(long)]
    pub no_progress: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Checkpoint location shared by every subcommand.
#[derive(Debug, Args)]
pub struct CheckpointArgs {
    /// Checkpoint file (default: platform cache directory)
    #[arg(long = "checkpoint", value_name = "PATH")]
    pub path: Option<PathBuf>,
}
