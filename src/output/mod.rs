//! Output formatters for scan, deletion and analysis results.
//!
//! - [`text`]: colored, human-readable listing
//! - [`json`]: one JSON document per run for scripting
//!
//! # Example
//!
//! ```no_run
//! use psamfinder::diagnostics::DiagnosticLog;
//! use psamfinder::duplicates::DuplicateFinder;
//! use psamfinder::output::TextOutput;
//! use std::path::Path;
//!
//! let log = DiagnosticLog::new();
//! let (groups, summary) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."), &log)
//!     .unwrap();
//!
//! let text = TextOutput::new(true);
//! let mut stdout = std::io::stdout();
//! text.write_groups(&mut stdout, &groups).unwrap();
//! text.write_summary(&mut stdout, &summary).unwrap();
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::{write_json, JsonDeletion, JsonOutputError, JsonScanOutput, JsonThresholdOutput};
pub use text::TextOutput;
