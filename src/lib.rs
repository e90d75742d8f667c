//! psamfinder - exact and near-duplicate file finder
//!
//! Finds files with identical content (SHA-256 or BLAKE3 digests) or images
//! that look alike (64-bit perceptual fingerprints compared by Hamming
//! distance), groups them with a disjoint-set partition, and removes
//! redundant copies through an explicit per-group keep/skip plan.
//!
//! Per-file failures never end up in results; they are reported to a
//! [`diagnostics::DiagnosticSink`]. The functions at the crate root use
//! [`diagnostics::LogSink`], which logs them at `warn` level.
//!
//! ```no_run
//! let groups = psamfinder::find_duplicates("/photos", true, 0.85)?;
//! for group in &groups {
//!     println!("{:?}", group.paths().collect::<Vec<_>>());
//! }
//! # Ok::<(), psamfinder::duplicates::FinderError>(())
//! ```

pub mod actions;
pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::path::Path;

pub use app::run_app;

use actions::{DeleteOptions, DeletionOutcome, DeletionPlan, KeepSelection};
use analysis::{AnalysisError, AnalyzerConfig, SimilarityAnalyzer, SimilarityReport};
use diagnostics::LogSink;
use duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, FinderError};

/// Scan `directory` recursively and return groups of duplicates.
///
/// With `fuzzy`, only images are considered and grouped when their
/// similarity is at least `threshold`; otherwise files are grouped by
/// identical content and `threshold` is ignored.
///
/// # Errors
///
/// [`FinderError::InvalidDirectory`] if `directory` is not a directory,
/// [`FinderError::InvalidThreshold`] for a fuzzy threshold outside `(0, 1]`.
pub fn find_duplicates(
    directory: impl AsRef<Path>,
    fuzzy: bool,
    threshold: f64,
) -> Result<Vec<DuplicateGroup>, FinderError> {
    let config = FinderConfig::default()
        .with_fuzzy(fuzzy)
        .with_threshold(threshold);
    let (groups, _) = DuplicateFinder::new(config).find_duplicates(directory.as_ref(), &LogSink)?;
    Ok(groups)
}

/// Sample up to `max_images` images (0 = all) under `directory` and report
/// their pairwise fingerprint distances with a suggested threshold.
///
/// # Errors
///
/// [`AnalysisError::InvalidDirectory`] if `directory` is not a directory.
pub fn analyze_similarity(
    directory: impl AsRef<Path>,
    max_images: usize,
    verbose: bool,
) -> Result<SimilarityReport, AnalysisError> {
    let config = AnalyzerConfig::default()
        .with_max_images(max_images)
        .with_verbose(verbose);
    SimilarityAnalyzer::new(config).analyze(directory.as_ref(), &LogSink)
}

/// Resolve `selections[i]` against `groups[i]`. See [`actions::plan_deletion`].
#[must_use]
pub fn plan_deletion(groups: &[DuplicateGroup], selections: &[KeepSelection]) -> Vec<DeletionPlan> {
    actions::plan_deletion(groups, selections, &LogSink)
}

/// Remove (or with `dry_run`, only check) every file the plans mark for
/// removal. See [`actions::execute_deletion`].
#[must_use]
pub fn execute_deletion(plans: Vec<DeletionPlan>, dry_run: bool) -> Vec<DeletionOutcome> {
    let options = DeleteOptions {
        dry_run,
        ..DeleteOptions::default()
    };
    actions::execute_deletion(plans, &options, &LogSink)
}
