//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Disjoint-set partitioning of fingerprinted files
//! - Exact grouping by content digest
//! - Fuzzy grouping by perceptual fingerprint distance
//! - Scan orchestration over a directory tree

pub mod finder;
pub mod groups;
pub mod union_find;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, ScanSummary, DEFAULT_IO_THREADS,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use groups::{group_exact, group_similar, DuplicateGroup, GroupKind, PAIRWISE_WARN_THRESHOLD};
pub use union_find::DisjointSet;
