//! Cooperative cancellation and Ctrl+C handling.
//!
//! A single [`CancelToken`] is shared by every traversal worker. The signal
//! handler sets it, and each worker checks it before descending into the
//! next directory. Workers then unwind and the orchestrator writes a
//! checkpoint.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupescan::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! // Pass clones to workers; check at directory boundaries.
//! let worker_token = token.clone();
//! if worker_token.is_cancelled() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag.
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C / SIGTERM handler that cancels the returned token.
///
/// The handler is registered once per process. Later calls reset and
/// return the same token, so `run_app` can be invoked repeatedly (as the
/// integration tests do).
///
/// # Errors
///
/// Returns [`SignalError`] if the handler cannot be registered and no
/// token was installed earlier.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let handler_token = token.clone();

    match ctrlc::set_handler(move || {
        handler_token.cancel();
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing current directories and saving checkpoint..."
        );
        let _ = std::io::stderr().flush();
        log::info!("Cancellation signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            // Someone else owns the process handler; fall back to a token
            // that only manual cancellation can set.
            log::debug!("Ctrl+C handler already registered, using unhooked token");
            let fallback = GLOBAL_TOKEN.get_or_init(CancelToken::new);
            fallback.reset();
            Ok(fallback.clone())
        }
        Err(e) => Err(e.into()),
    }
}
