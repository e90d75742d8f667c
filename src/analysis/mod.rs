//! Threshold analysis over pairwise fingerprint distances.
//!
//! The analyzer fingerprints a sample of images and reports how far apart
//! every pair is, so a user can pick a similarity threshold for fuzzy scans
//! that matches their collection. It never groups and never writes.

pub mod similarity;

pub use similarity::{
    build_report, suggest_threshold, AnalysisError, AnalyzerConfig, DistanceStats,
    HistogramBucket, PairDistance, SimilarityAnalyzer, SimilarityReport, CLOSEST_PAIRS,
    DEFAULT_MAX_IMAGES, HISTOGRAM_BOUNDS,
};
