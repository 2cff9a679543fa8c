//! Exit codes and structured error output.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: the command completed
/// - 1: a fatal error, including an interruption whose checkpoint could not
///   be written
/// - 130: interrupted by the user, progress checkpointed for resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The command completed.
    Success = 0,
    /// A fatal error occurred.
    GeneralError = 1,
    /// Interrupted by Ctrl+C or SIGTERM; rerun to resume.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DS000",
            Self::GeneralError => "DS001",
            Self::Interrupted => "DS130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. "DS001"
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message including its causes
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Describe `err` for machine consumption.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
