//! Logging setup.
//!
//! Diagnostics go through the `log` facade to an `env_logger` backend on
//! stderr. The level is chosen by, in priority order:
//!
//! 1. the `RUST_LOG` environment variable, if set
//! 2. `--quiet` (errors only) or `--verbose` (`-v` debug, `-vv` trace)
//! 3. the default, info
//!
//! ```rust,no_run
//! use dupescan::logging::init_logging;
//!
//! init_logging(1, false).ok();
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};

/// Install the global logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<(), SetLoggerError> {
    let from_env = env::var_os("RUST_LOG").is_some();

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);
    builder.try_init()?;

    log::debug!(
        "Logging initialized at {} (from RUST_LOG: {})",
        log::max_level(),
        from_env
    );
    Ok(())
}

/// Map CLI verbosity flags to a level. Quiet wins over verbose.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    // Debug builds and -v runs carry the module path; release output is
    // level and message only.
    let with_module = cfg!(debug_assertions) || verbose > 0;

    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if with_module {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });
}
