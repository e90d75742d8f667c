//! Pairwise similarity report for threshold selection.
//!
//! # Overview
//!
//! [`SimilarityAnalyzer::analyze`] collects the images under a directory,
//! sorts them by path, keeps the first `max_images`, fingerprints them on a
//! bounded pool and computes the distance of every pair of successfully
//! fingerprinted images. [`build_report`] does the pure part and can be
//! called directly with precomputed fingerprints.
//!
//! The report carries:
//! - every pair, ascending by distance
//! - [`DistanceStats`]: count, min, max, mean and nearest-rank percentiles
//! - a histogram over [`HISTOGRAM_BOUNDS`] plus an overflow bucket
//! - a suggested threshold (see [`suggest_threshold`])
//! - in verbose mode, the [`CLOSEST_PAIRS`] most similar pairs
//!
//! # Example
//!
//! ```no_run
//! use psamfinder::analysis::{AnalyzerConfig, SimilarityAnalyzer};
//! use psamfinder::diagnostics::LogSink;
//! use std::path::Path;
//!
//! let analyzer = SimilarityAnalyzer::new(AnalyzerConfig::default().with_verbose(true));
//! let report = analyzer.analyze(Path::new("/photos"), &LogSink).unwrap();
//! if let Some(t) = report.suggested_threshold {
//!     println!("try --similarity-threshold {t:.2}");
//! }
//! ```

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::scanner::{
    PerceptualAlgorithm, PerceptualFingerprint, PerceptualHasher, Walker, WalkerConfig,
    FINGERPRINT_BITS,
};

/// Default cap on the number of sampled images.
pub const DEFAULT_MAX_IMAGES: usize = 300;

/// Number of closest pairs kept in verbose mode.
pub const CLOSEST_PAIRS: usize = 10;

/// Inclusive upper bounds (in bits) of the histogram buckets. Distances
/// above the last bound land in a final overflow bucket.
pub const HISTOGRAM_BOUNDS: [u32; 7] = [0, 5, 10, 15, 20, 25, 30];

/// Extra bits added to the closest non-identical pair when suggesting.
const SUGGESTION_BUFFER_BITS: u32 = 3;
const SUGGESTION_MIN: f64 = 0.70;
const SUGGESTION_MAX: f64 = 0.90;
const SUGGESTION_ALL_IDENTICAL: f64 = 0.95;

/// Configuration for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Maximum number of images sampled; 0 means no limit.
    pub max_images: usize,
    /// Include the closest pairs in the report.
    pub verbose: bool,
    /// Fingerprint algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Number of fingerprinting threads.
    pub io_threads: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_images: DEFAULT_MAX_IMAGES,
            verbose: false,
            algorithm: PerceptualAlgorithm::default(),
            io_threads: crate::duplicates::DEFAULT_IO_THREADS,
            walker_config: WalkerConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Set the sample cap (0 = no limit).
    #[must_use]
    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// Toggle verbose output.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the fingerprint algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: PerceptualAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the thread count (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }
}

/// Distance between two sampled images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDistance {
    /// First image (earlier in sample order)
    pub path_a: PathBuf,
    /// Second image
    pub path_b: PathBuf,
    /// Differing bits
    pub distance_bits: u32,
    /// Normalized distance in `[0, 1]`
    pub distance: f64,
}

impl PairDistance {
    /// `1 - distance`.
    #[must_use]
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Summary of the pairwise distance distribution, in bits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceStats {
    /// Number of pairs
    pub count: usize,
    /// Smallest distance
    pub min_bits: u32,
    /// Largest distance
    pub max_bits: u32,
    /// Arithmetic mean
    pub mean_bits: f64,
    /// 10th percentile (nearest rank)
    pub p10_bits: u32,
    /// Median (nearest rank)
    pub p50_bits: u32,
    /// 90th percentile (nearest rank)
    pub p90_bits: u32,
}

impl DistanceStats {
    /// Compute stats over distances sorted ascending. `None` when empty.
    #[must_use]
    pub fn from_sorted(sorted_bits: &[u32]) -> Option<Self> {
        let (&min_bits, &max_bits) = (sorted_bits.first()?, sorted_bits.last()?);
        let count = sorted_bits.len();
        let sum: u64 = sorted_bits.iter().map(|&d| u64::from(d)).sum();

        Some(Self {
            count,
            min_bits,
            max_bits,
            mean_bits: sum as f64 / count as f64,
            p10_bits: nearest_rank(sorted_bits, 10),
            p50_bits: nearest_rank(sorted_bits, 50),
            p90_bits: nearest_rank(sorted_bits, 90),
        })
    }

    /// Mean as a normalized distance.
    #[must_use]
    pub fn mean_distance(&self) -> f64 {
        self.mean_bits / f64::from(FINGERPRINT_BITS)
    }
}

/// Nearest-rank percentile of a non-empty ascending slice.
fn nearest_rank(sorted: &[u32], percent: usize) -> u32 {
    let rank = (percent * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

/// One bar of the distance histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    /// Inclusive upper bound in bits; `None` for the overflow bucket
    pub max_bits: Option<u32>,
    /// Pairs whose distance falls in this bucket and no earlier one
    pub count: usize,
}

impl HistogramBucket {
    /// Label such as `<= 10 bits` or `> 30 bits`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.max_bits {
            Some(max) => format!("<= {max:2} bits"),
            None => format!("> {} bits", HISTOGRAM_BOUNDS[HISTOGRAM_BOUNDS.len() - 1]),
        }
    }
}

fn histogram(sorted_bits: &[u32]) -> Vec<HistogramBucket> {
    let mut buckets: Vec<HistogramBucket> = HISTOGRAM_BOUNDS
        .iter()
        .map(|&max| HistogramBucket {
            max_bits: Some(max),
            count: 0,
        })
        .chain(std::iter::once(HistogramBucket {
            max_bits: None,
            count: 0,
        }))
        .collect();

    for &d in sorted_bits {
        let slot = HISTOGRAM_BOUNDS
            .iter()
            .position(|&max| d <= max)
            .unwrap_or(HISTOGRAM_BOUNDS.len());
        buckets[slot].count += 1;
    }
    buckets
}

/// Result of a similarity analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityReport {
    /// Images selected for the sample (after the cap)
    pub images_sampled: usize,
    /// Sampled images that produced a fingerprint
    pub images_fingerprinted: usize,
    /// All pairs, ascending by distance
    pub pairs: Vec<PairDistance>,
    /// Distribution summary; `None` without pairs
    pub stats: Option<DistanceStats>,
    /// Bucketed distribution; empty without pairs
    pub histogram: Vec<HistogramBucket>,
    /// Suggested similarity threshold; `None` without pairs
    pub suggested_threshold: Option<f64>,
    /// Closest pairs (verbose only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub closest_pairs: Vec<PairDistance>,
}

impl SimilarityReport {
    /// Whether at least two images were fingerprinted.
    #[must_use]
    pub fn is_sufficient(&self) -> bool {
        self.images_fingerprinted >= 2
    }
}

/// Suggest a threshold from distances sorted ascending.
///
/// Takes the smallest non-zero distance plus a 3-bit buffer, converts it to
/// a similarity rounded to two decimals and clamps it to `[0.70, 0.90]`.
/// Returns `0.95` when every pair is identical and `None` without pairs.
#[must_use]
pub fn suggest_threshold(sorted_bits: &[u32]) -> Option<f64> {
    if sorted_bits.is_empty() {
        return None;
    }
    let Some(&closest) = sorted_bits.iter().find(|&&d| d > 0) else {
        return Some(SUGGESTION_ALL_IDENTICAL);
    };

    let bits = f64::from(closest + SUGGESTION_BUFFER_BITS);
    let similarity = 1.0 - bits / f64::from(FINGERPRINT_BITS);
    let rounded = (similarity * 100.0).round() / 100.0;
    Some(rounded.clamp(SUGGESTION_MIN, SUGGESTION_MAX))
}

/// Build a report from fingerprinted images in sample order.
///
/// `images_sampled` is the sample size before fingerprinting failures.
#[must_use]
pub fn build_report(
    images_sampled: usize,
    fingerprints: &[(PathBuf, PerceptualFingerprint)],
    verbose: bool,
) -> SimilarityReport {
    let n = fingerprints.len();
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for (i, (path_a, fp_a)) in fingerprints.iter().enumerate() {
        for (path_b, fp_b) in &fingerprints[i + 1..] {
            pairs.push(PairDistance {
                path_a: path_a.clone(),
                path_b: path_b.clone(),
                distance_bits: fp_a.distance_bits(fp_b),
                distance: fp_a.distance(fp_b),
            });
        }
    }
    // Stable, so equal distances keep sample order.
    pairs.sort_by_key(|p| p.distance_bits);

    let sorted_bits: Vec<u32> = pairs.iter().map(|p| p.distance_bits).collect();
    let closest_pairs = if verbose {
        pairs.iter().take(CLOSEST_PAIRS).cloned().collect()
    } else {
        Vec::new()
    };

    SimilarityReport {
        images_sampled,
        images_fingerprinted: n,
        stats: DistanceStats::from_sorted(&sorted_bits),
        histogram: if sorted_bits.is_empty() {
            Vec::new()
        } else {
            histogram(&sorted_bits)
        },
        suggested_threshold: suggest_threshold(&sorted_bits),
        pairs,
        closest_pairs,
    }
}

/// Errors that can occur during analysis.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// The root does not exist or is not a directory.
    #[error("Not a directory: {0}")]
    InvalidDirectory(PathBuf),

    /// The fingerprinting pool could not be created.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Samples images under a directory and reports their pairwise distances.
#[derive(Debug, Clone, Default)]
pub struct SimilarityAnalyzer {
    config: AnalyzerConfig,
}

impl SimilarityAnalyzer {
    /// Create an analyzer.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Collect the image sample: every image under `root`, sorted by path,
    /// truncated to `max_images` when non-zero. Walk errors go to `sink`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidDirectory`] if `root` is not a directory.
    pub fn sample(
        &self,
        root: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<Vec<PathBuf>, AnalysisError> {
        if !root.is_dir() {
            return Err(AnalysisError::InvalidDirectory(root.to_path_buf()));
        }
        let root = root
            .canonicalize()
            .map_err(|_| AnalysisError::InvalidDirectory(root.to_path_buf()))?;

        let mut images: Vec<PathBuf> = Walker::new(&root, self.config.walker_config.clone())
            .walk()
            .filter_map(|result| match result {
                Ok(file) if file.is_image() => Some(file.path),
                Ok(_) => None,
                Err(e) => {
                    sink.report(Diagnostic::io(e.path(), e.to_string()));
                    None
                }
            })
            .collect();

        images.sort();
        if self.config.max_images > 0 && images.len() > self.config.max_images {
            log::info!(
                "Sampling {} of {} images",
                self.config.max_images,
                images.len()
            );
            images.truncate(self.config.max_images);
        }
        Ok(images)
    }

    /// Analyze the images under `root`.
    ///
    /// A report with fewer than two fingerprinted images is still returned;
    /// check [`SimilarityReport::is_sufficient`].
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidDirectory`] if `root` is not a directory,
    /// [`AnalysisError::ThreadPool`] if the worker pool cannot start.
    pub fn analyze(
        &self,
        root: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<SimilarityReport, AnalysisError> {
        let images = self.sample(root, sink)?;
        let sampled = images.len();
        log::info!("Fingerprinting {} images", sampled);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads.max(1))
            .build()?;
        let hasher = PerceptualHasher::new(self.config.algorithm);

        let results: Vec<_> = pool.install(|| {
            images
                .into_par_iter()
                .map(|path| {
                    let result = hasher.fingerprint(&path);
                    (path, result)
                })
                .collect()
        });

        let mut fingerprints = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(fp) => fingerprints.push((path, fp)),
                Err(e) => sink.report(Diagnostic::for_image(&path, &e)),
            }
        }

        let report = build_report(sampled, &fingerprints, self.config.verbose);
        log::debug!(
            "Analyzed {} pairs from {} images",
            report.pairs.len(),
            report.images_fingerprinted
        );
        Ok(report)
    }
}
