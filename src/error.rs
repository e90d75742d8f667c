//! Process exit codes and the JSON error envelope.

use serde::Serialize;

/// Exit codes for the `psamfinder` binary.
///
/// - 0: completed normally (with or without duplicates)
/// - 1: error, invalid input, or too few images to analyze
/// - 3: completed, but some files were skipped or could not be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed normally.
    Success = 0,
    /// Fatal error or invalid input.
    GeneralError = 1,
    /// Completed with reported per-file failures.
    PartialSuccess = 3,
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
            Self::Success => "PF000",
            Self::GeneralError => "PF001",
            Self::PartialSuccess => "PF003",
        }
    }

    /// `PartialSuccess` when any diagnostic was reported, else `Success`.
    #[must_use]
    pub fn from_diagnostic_count(count: usize) -> Self {
        if count > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Error shape printed on stdout when `--output json` is active.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. "PF001"
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Error message including its context chain
    pub message: String,
}

impl StructuredError {
    /// Build from an error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
