//! Human-readable terminal output.
//!
//! Everything is written to a caller-supplied `Write`, so the binary passes
//! stdout and tests pass a `Vec<u8>`. Coloring is per renderer (`color`),
//! not global.

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::{Condition, Paint, Painted, Style};

use crate::actions::{DeletionOutcome, DeletionStatus, DeletionSummary};
use crate::analysis::{PairDistance, SimilarityReport};
use crate::diagnostics::Diagnostic;
use crate::duplicates::{DuplicateGroup, GroupKind, ScanSummary};

const HEADER: Style = Style::new().bold();
const GOOD: Style = Style::new().green();
const WARN: Style = Style::new().yellow();
const BAD: Style = Style::new().red().bold();
const DIM: Style = Style::new().dim();

/// Text renderer.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput {
    color: bool,
}

impl TextOutput {
    /// Create a renderer; `color` enables ANSI styling.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint<'a, T: ?Sized>(&self, value: &'a T, style: Style) -> Painted<&'a T> {
        let condition = if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        };
        value.paint(style).whenever(condition)
    }

    /// List every group with its members.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_groups<W: Write>(
        &self,
        w: &mut W,
        groups: &[DuplicateGroup],
    ) -> io::Result<()> {
        if groups.is_empty() {
            return writeln!(w, "{}", self.paint("No duplicates found", GOOD));
        }

        writeln!(w, "{}", self.paint("Duplicates found", HEADER))?;
        for (i, group) in groups.iter().enumerate() {
            writeln!(w)?;
            match &group.kind {
                GroupKind::Exact { digest } => {
                    writeln!(w, "Group {} {}", i + 1, self.paint(&format!("hash {digest}"), DIM))?;
                }
                GroupKind::Similar {
                    threshold,
                    max_distance_bits,
                    ..
                } => {
                    let detail = format!(
                        "similar images, threshold {threshold:.2}, \
                         up to {max_distance_bits} bits apart"
                    );
                    writeln!(w, "Group {} {}", i + 1, self.paint(&detail, DIM))?;
                    if group.is_chained() {
                        let note = "note: some members are only similar through other members";
                        writeln!(w, "  {}", self.paint(note, WARN))?;
                    }
                }
            }
            for file in &group.files {
                writeln!(w, "  - {} ({})", file.path.display(), ByteSize(file.size))?;
            }
        }
        Ok(())
    }

    /// One-paragraph scan summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_summary<W: Write>(&self, w: &mut W, summary: &ScanSummary) -> io::Result<()> {
        writeln!(w)?;
        writeln!(
            w,
            "Scanned {} files ({}) in {:.2}s; fingerprinted {}",
            summary.files_discovered,
            summary.total_size_display(),
            summary.scan_duration.as_secs_f64(),
            summary.files_fingerprinted,
        )?;
        writeln!(
            w,
            "{} groups, {} redundant files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            self.paint(&summary.reclaimable_display(), GOOD),
        )?;
        if summary.has_skipped() {
            let skipped = format!(
                "{} files skipped, {} walk errors (see warnings)",
                summary.files_skipped, summary.walk_errors
            );
            writeln!(w, "{}", self.paint(&skipped, WARN))?;
        }
        Ok(())
    }

    /// Diagnostics, one per line. Writes nothing when there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_diagnostics<W: Write>(
        &self,
        w: &mut W,
        diagnostics: &[Diagnostic],
    ) -> io::Result<()> {
        for d in diagnostics {
            writeln!(w, "{} {}", self.paint("skipped:", WARN), d)?;
        }
        Ok(())
    }

    /// Per-file deletion results followed by a total.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_outcomes<W: Write>(
        &self,
        w: &mut W,
        outcomes: &[DeletionOutcome],
        dry_run: bool,
    ) -> io::Result<()> {
        for outcome in outcomes {
            let path = outcome.path.display();
            match &outcome.status {
                DeletionStatus::Removed => {
                    writeln!(w, "{} {}", self.paint("Deleted:", GOOD), path)?;
                }
                DeletionStatus::WouldRemove => {
                    writeln!(w, "{} {}", self.paint("Would delete:", DIM), path)?;
                }
                DeletionStatus::Failed(reason) => {
                    writeln!(w, "{} {}: {}", self.paint("Failed:", BAD), path, reason)?;
                }
            }
        }

        let totals = DeletionSummary::from_outcomes(outcomes);
        writeln!(w)?;
        if dry_run {
            writeln!(
                w,
                "Dry run complete: {} files ({}) would be removed; nothing was touched",
                totals.would_remove,
                ByteSize(totals.bytes)
            )?;
        } else if totals.removed > 0 {
            writeln!(w, "Removed {} files, freed {}", totals.removed, ByteSize(totals.bytes))?;
        } else {
            writeln!(w, "No files deleted (all groups skipped or invalid choices)")?;
        }
        if totals.failed > 0 {
            writeln!(w, "{}", self.paint(&format!("{} removals failed", totals.failed), BAD))?;
        }
        Ok(())
    }

    /// Similarity analysis results.
    ///
    /// The closest pairs, every pair by ascending distance, and the
    /// distribution are printed when the report is verbose.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_report<W: Write>(&self, w: &mut W, report: &SimilarityReport) -> io::Result<()> {
        writeln!(
            w,
            "Processed {} of {} sampled images, {} pairs",
            report.images_fingerprinted,
            report.images_sampled,
            report.pairs.len()
        )?;
        if !report.is_sufficient() {
            let message = "Not enough images to compare (need at least 2)";
            return writeln!(w, "{}", self.paint(message, BAD));
        }

        if let Some(stats) = &report.stats {
            writeln!(w)?;
            writeln!(w, "{}", self.paint("Distance (bits out of 64)", HEADER))?;
            writeln!(
                w,
                "  min {}  p10 {}  median {}  p90 {}  max {}  mean {:.1}",
                stats.min_bits,
                stats.p10_bits,
                stats.p50_bits,
                stats.p90_bits,
                stats.max_bits,
                stats.mean_bits
            )?;
        }

        if !report.closest_pairs.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", self.paint("Most similar pairs", HEADER))?;
            for pair in &report.closest_pairs {
                write_pair(w, pair)?;
            }

            writeln!(w)?;
            writeln!(w, "{}", self.paint("All pairs", HEADER))?;
            for pair in &report.pairs {
                write_pair(w, pair)?;
            }

            writeln!(w)?;
            writeln!(w, "{}", self.paint("Distance distribution", HEADER))?;
            let total = report.pairs.len().max(1) as f64;
            for bucket in &report.histogram {
                writeln!(
                    w,
                    "  {}: {:4} pairs ({:.1}%)",
                    bucket.label(),
                    bucket.count,
                    bucket.count as f64 / total * 100.0
                )?;
            }
        }

        if let Some(suggested) = report.suggested_threshold {
            writeln!(w)?;
            writeln!(
                w,
                "Suggestion: try {} to catch resized or edited versions like these",
                self.paint(&format!("--similarity-threshold {suggested:.2}"), GOOD)
            )?;
        }
        if !report.closest_pairs.is_empty() {
            writeln!(w)?;
            writeln!(w, "  Very strict (near-exact): 0.90 to 0.95 (<= 3-6 bits)")?;
            writeln!(w, "  Resized or cropped:       0.75 to 0.85 (<= 10-16 bits)")?;
            writeln!(w, "  Lenient:                  0.65 to 0.74 (<= 17-22 bits)")?;
        }
        Ok(())
    }
}

fn write_pair<W: Write>(w: &mut W, pair: &PairDistance) -> io::Result<()> {
    writeln!(
        w,
        "  dist {:2} -> sim {:.3} | {} <-> {}",
        pair.distance_bits,
        pair.similarity(),
        file_name(&pair.path_a),
        file_name(&pair.path_b)
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
