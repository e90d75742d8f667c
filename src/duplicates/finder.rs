//! Scan orchestration: walk, fingerprint, group.
//!
//! # Overview
//!
//! [`DuplicateFinder`] runs the complete pipeline for one directory:
//! 1. **Walk** - collect regular files in discovery order (sequential)
//! 2. **Fingerprint** - content digest for every file (exact mode), or a
//!    perceptual fingerprint for every image (fuzzy mode), on a bounded
//!    rayon pool; results are collected back in discovery order
//! 3. **Group** - [`group_exact`] or [`group_similar`]
//!
//! Files that cannot be read or decoded are reported to the
//! [`DiagnosticSink`] and left out of grouping. They never abort the scan.
//!
//! # Example
//!
//! ```no_run
//! use psamfinder::diagnostics::LogSink;
//! use psamfinder::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_fuzzy(true).with_threshold(0.85);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/photos"), &LogSink).unwrap();
//! println!("Found {} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use super::groups::{group_exact, group_similar, DuplicateGroup};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::progress::{ProgressCallback, PHASE_FINGERPRINTING, PHASE_HASHING, PHASE_WALKING};
use crate::scanner::{
    ContentHasher, DigestAlgorithm, FileEntry, PerceptualAlgorithm, PerceptualHasher, Walker,
    WalkerConfig,
};

/// Default similarity threshold for fuzzy image matching.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Default size of the hashing pool.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Perceptual image matching instead of exact content matching.
    pub fuzzy: bool,
    /// Minimum similarity in `(0, 1]` for fuzzy matches.
    pub threshold: f64,
    /// Digest used in exact mode.
    pub digest_algorithm: DigestAlgorithm,
    /// Fingerprint algorithm used in fuzzy mode.
    pub perceptual_algorithm: PerceptualAlgorithm,
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("fuzzy", &self.fuzzy)
            .field("threshold", &self.threshold)
            .field("digest_algorithm", &self.digest_algorithm)
            .field("perceptual_algorithm", &self.perceptual_algorithm)
            .field("io_threads", &self.io_threads)
            .field("walker_config", &self.walker_config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            fuzzy: false,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            digest_algorithm: DigestAlgorithm::default(),
            perceptual_algorithm: PerceptualAlgorithm::default(),
            io_threads: DEFAULT_IO_THREADS,
            walker_config: WalkerConfig::default(),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Enable or disable fuzzy image matching.
    #[must_use]
    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Set the similarity threshold for fuzzy matching.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the content digest algorithm.
    #[must_use]
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Set the perceptual fingerprint algorithm.
    #[must_use]
    pub fn with_perceptual_algorithm(mut self, algorithm: PerceptualAlgorithm) -> Self {
        self.perceptual_algorithm = algorithm;
        self
    }

    /// Create a new configuration with custom I/O thread count.
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

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Regular files found by the walk
    pub files_discovered: usize,
    /// Total size of all discovered files in bytes
    pub total_size: u64,
    /// Files that produced a digest or fingerprint
    pub files_fingerprinted: usize,
    /// Files left out because they could not be read or decoded
    pub files_skipped: usize,
    /// Directories or entries the walk could not read
    pub walk_errors: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one kept copy per group)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub scan_duration: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ScanSummary {
    /// Whether any file or directory was skipped.
    #[must_use]
    pub fn has_skipped(&self) -> bool {
        self.files_skipped > 0 || self.walk_errors > 0
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::reclaimable_space).sum();
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The root does not exist or is not a directory.
    #[error("Not a directory: {0}")]
    InvalidDirectory(PathBuf),

    /// The similarity threshold is outside `(0, 1]`.
    #[error("Similarity threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    /// The hashing pool could not be created.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Duplicate finder that orchestrates walk, fingerprinting and grouping.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate groups under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidDirectory`] before doing any work if
    /// `path` is not an existing directory, [`FinderError::InvalidThreshold`]
    /// if fuzzy mode is on with a threshold outside `(0, 1]`, and
    /// [`FinderError::ThreadPool`] if the worker pool cannot start.
    /// Unreadable files are reported to `sink` instead.
    pub fn find_duplicates(
        &self,
        path: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.validate_threshold()?;

        if !path.is_dir() {
            return Err(FinderError::InvalidDirectory(path.to_path_buf()));
        }
        let root = path
            .canonicalize()
            .map_err(|_| FinderError::InvalidDirectory(path.to_path_buf()))?;

        log::info!(
            "Starting {} scan of {}",
            if self.config.fuzzy { "fuzzy image" } else { "exact" },
            root.display()
        );

        let progress = self.config.progress_callback.as_deref();
        if let Some(callback) = progress {
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        let walker = Walker::new(&root, self.config.walker_config.clone());
        let mut files = Vec::new();
        let mut walk_errors = 0;
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    if let Some(callback) = progress {
                        callback.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Err(e) => {
                    walk_errors += 1;
                    sink.report(Diagnostic::io(e.path(), e.to_string()));
                }
            }
        }

        if let Some(callback) = progress {
            callback.on_phase_end(PHASE_WALKING);
        }

        let total_size: u64 = files.iter().map(|f| f.size).sum();
        log::info!(
            "Found {} files ({} total)",
            files.len(),
            ByteSize(total_size)
        );

        let (groups, mut summary) = self.find_duplicates_from_files(files, sink)?;
        summary.walk_errors = walk_errors;
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Find duplicates from a pre-collected list of files.
    ///
    /// `files` must be in discovery order. No directory validation is done.
    ///
    /// # Errors
    ///
    /// See [`DuplicateFinder::find_duplicates`]; `InvalidDirectory` is never
    /// returned here.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileEntry>,
        sink: &dyn DiagnosticSink,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.validate_threshold()?;

        let mut summary = ScanSummary {
            files_discovered: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            ..ScanSummary::default()
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads.max(1))
            .build()?;

        let groups = if self.config.fuzzy {
            let images: Vec<FileEntry> = files.into_iter().filter(FileEntry::is_image).collect();
            log::debug!("{} image candidates for fuzzy matching", images.len());

            let hasher = PerceptualHasher::new(self.config.perceptual_algorithm);
            let results = self.fingerprint_all(&pool, PHASE_FINGERPRINTING, images, |path| {
                hasher.fingerprint(path)
            });

            let mut fingerprinted = Vec::with_capacity(results.len());
            for (file, result) in results {
                match result {
                    Ok(fp) => fingerprinted.push((file, fp)),
                    Err(e) => {
                        summary.files_skipped += 1;
                        sink.report(Diagnostic::for_image(&file.path, &e));
                    }
                }
            }
            summary.files_fingerprinted = fingerprinted.len();
            group_similar(fingerprinted, self.config.threshold)
        } else {
            let hasher = ContentHasher::new(self.config.digest_algorithm);
            let results =
                self.fingerprint_all(&pool, PHASE_HASHING, files, |path| hasher.hash_file(path));

            let mut hashed = Vec::with_capacity(results.len());
            for (file, result) in results {
                match result {
                    Ok(digest) => hashed.push((file, digest)),
                    Err(e) => {
                        summary.files_skipped += 1;
                        sink.report(Diagnostic::io(&file.path, e.to_string()));
                    }
                }
            }
            summary.files_fingerprinted = hashed.len();
            group_exact(hashed)
        };

        summary.record_groups(&groups);
        summary.scan_duration = start_time.elapsed();
        Ok((groups, summary))
    }

    fn validate_threshold(&self) -> Result<(), FinderError> {
        let t = self.config.threshold;
        if self.config.fuzzy && !(t > 0.0 && t <= 1.0) {
            return Err(FinderError::InvalidThreshold(t));
        }
        Ok(())
    }

    /// Run `fingerprint` over every file on `pool`, keeping input order.
    fn fingerprint_all<T, E, F>(
        &self,
        pool: &rayon::ThreadPool,
        phase: &str,
        files: Vec<FileEntry>,
        fingerprint: F,
    ) -> Vec<(FileEntry, Result<T, E>)>
    where
        T: Send,
        E: Send,
        F: Fn(&Path) -> Result<T, E> + Sync,
    {
        let progress = self.config.progress_callback.as_deref();
        if let Some(callback) = progress {
            callback.on_phase_start(phase, files.len());
        }
        let done = AtomicUsize::new(0);

        let results = pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    let result = fingerprint(&file.path);
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(callback) = progress {
                        callback.on_progress(current, &file.path.to_string_lossy());
                    }
                    (file, result)
                })
                .collect()
        });

        if let Some(callback) = progress {
            callback.on_phase_end(phase);
        }
        results
    }
}
