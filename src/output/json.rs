//! JSON output for scripting.
//!
//! # Scan schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "kind": "exact",
//!       "digest": "9f86d0...",
//!       "files": [ { "path": "...", "size": 4, "modified": ... } ]
//!     },
//!     {
//!       "kind": "similar",
//!       "threshold": 0.8,
//!       "allowed_bits": 12,
//!       "max_distance_bits": 9,
//!       "files": [ ... ]
//!     }
//!   ],
//!   "summary": {
//!     "files_discovered": 10,
//!     "duplicate_groups": 2,
//!     "reclaimable_space": 4096,
//!     "duration_secs": 0.12,
//!     ...
//!   },
//!   "diagnostics": [ { "path": "...", "kind": "decode", "reason": "..." } ],
//!   "deletion": { "dry_run": true, "plans": [ ... ], "outcomes": [ ... ], "totals": { ... } },
//!   "exit_code": 3,
//!   "exit_code_name": "PF003"
//! }
//! ```
//!
//! `deletion` is present only when the deletion workflow ran.

use std::io::Write;

use serde::Serialize;

use crate::actions::{DeletionOutcome, DeletionPlan, DeletionSummary};
use crate::analysis::SimilarityReport;
use crate::diagnostics::Diagnostic;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// Deletion section of a scan document.
#[derive(Debug, Serialize)]
pub struct JsonDeletion<'a> {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// One plan per group
    pub plans: &'a [DeletionPlan],
    /// One outcome per planned removal
    pub outcomes: &'a [DeletionOutcome],
    /// Totals over `outcomes`
    pub totals: DeletionSummary,
}

impl<'a> JsonDeletion<'a> {
    /// Build the section, computing totals.
    #[must_use]
    pub fn new(dry_run: bool, plans: &'a [DeletionPlan], outcomes: &'a [DeletionOutcome]) -> Self {
        Self {
            dry_run,
            plans,
            outcomes,
            totals: DeletionSummary::from_outcomes(outcomes),
        }
    }
}

/// Document printed by `scan --output json`.
#[derive(Debug, Serialize)]
pub struct JsonScanOutput<'a> {
    /// Duplicate groups in output order
    pub groups: &'a [DuplicateGroup],
    /// Scan statistics
    pub summary: &'a ScanSummary,
    /// Every skipped file and failed action
    pub diagnostics: &'a [Diagnostic],
    /// Deletion results, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion: Option<JsonDeletion<'a>>,
    /// Process exit code
    pub exit_code: i32,
    /// Machine-readable exit code name
    pub exit_code_name: &'static str,
}

impl<'a> JsonScanOutput<'a> {
    /// Assemble a scan document.
    #[must_use]
    pub fn new(
        groups: &'a [DuplicateGroup],
        summary: &'a ScanSummary,
        diagnostics: &'a [Diagnostic],
        deletion: Option<JsonDeletion<'a>>,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            groups,
            summary,
            diagnostics,
            deletion,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }
}

/// Document printed by `threshold --output json`.
#[derive(Debug, Serialize)]
pub struct JsonThresholdOutput<'a> {
    /// The analysis
    #[serde(flatten)]
    pub report: &'a SimilarityReport,
    /// Images that could not be fingerprinted
    pub diagnostics: &'a [Diagnostic],
    /// Process exit code
    pub exit_code: i32,
    /// Machine-readable exit code name
    pub exit_code_name: &'static str,
}

impl<'a> JsonThresholdOutput<'a> {
    /// Assemble an analysis document.
    #[must_use]
    pub fn new(
        report: &'a SimilarityReport,
        diagnostics: &'a [Diagnostic],
        exit_code: ExitCode,
    ) -> Self {
        Self {
            report,
            diagnostics,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `value` followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}
