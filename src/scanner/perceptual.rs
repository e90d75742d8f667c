//! Perceptual image fingerprints for near-duplicate detection.
//!
//! This module provides the [`PerceptualHasher`] which reduces an image to a
//! 64-bit [`PerceptualFingerprint`] that stays stable under resizing and
//! re-encoding. Fingerprints are compared by normalized Hamming distance.

use std::fmt;
use std::path::Path;

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of every fingerprint in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// Extensions (lowercase) the fingerprinter will attempt to decode.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Whether `path` carries one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Supported perceptual hashing algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    #[default]
    Phash,
    /// dHash (Difference Hash) - Gradient-based, very fast and effective.
    Dhash,
    /// aHash (Average Hash) - Mean-based, fast but less resilient.
    Ahash,
}

impl fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phash => write!(f, "pHash"),
            Self::Dhash => write!(f, "dHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("Failed to load image {0}: {1}")]
    LoadError(String, #[source] image::ImageError),

    /// Image format not supported for hashing.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The hasher produced a hash of unexpected width.
    #[error("Expected a {FINGERPRINT_BITS}-bit hash, got {0} bytes")]
    UnexpectedWidth(usize),
}

/// A 64-bit perceptual fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualFingerprint(u64);

impl PerceptualFingerprint {
    /// Build a fingerprint from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Convert an `image_hasher` hash of exactly 8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::UnexpectedWidth`] for any other width.
    pub fn from_image_hash(hash: &ImageHash) -> Result<Self, PerceptualError> {
        let bytes = hash.as_bytes();
        if bytes.len() != 8 {
            return Err(PerceptualError::UnexpectedWidth(bytes.len()));
        }
        Ok(Self(
            bytes
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        ))
    }

    /// Number of differing bits.
    #[must_use]
    pub const fn distance_bits(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Hamming distance normalized to `[0, 1]`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        f64::from(self.distance_bits(other)) / f64::from(FINGERPRINT_BITS)
    }

    /// `1 - distance`.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f64 {
        1.0 - self.distance(other)
    }

    /// Largest bit distance that still satisfies `similarity >= threshold`.
    ///
    /// Computed in whole bits so that thresholds such as `0.75` are not
    /// lost to floating point error.
    #[must_use]
    pub fn max_distance_bits(threshold: f64) -> u32 {
        let allowed = (1.0 - threshold.clamp(0.0, 1.0)) * f64::from(FINGERPRINT_BITS);
        // The clamp keeps the cast in range.
        (allowed + 1e-9).floor() as u32
    }

    /// Whether two fingerprints are within `threshold` similarity.
    #[must_use]
    pub fn is_similar(&self, other: &Self, threshold: f64) -> bool {
        self.distance_bits(other) <= Self::max_distance_bits(threshold)
    }
}

impl fmt::Debug for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PerceptualFingerprint({:016x})", self.0)
    }
}

impl fmt::Display for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Computes perceptual fingerprints for images.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
    algorithm: PerceptualAlgorithm,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm.
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        let mut config = HasherConfig::new().hash_size(8, 8);

        match algorithm {
            PerceptualAlgorithm::Phash => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            PerceptualAlgorithm::Dhash => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            PerceptualAlgorithm::Ahash => {
                config = config.hash_alg(HashAlg::Mean);
            }
        }

        Self {
            hasher: config.to_hasher(),
            algorithm,
        }
    }

    /// Compute the fingerprint for an image at the given path.
    ///
    /// # Errors
    ///
    /// [`PerceptualError::UnsupportedFormat`] when the extension is not in
    /// [`IMAGE_EXTENSIONS`]; [`PerceptualError::LoadError`] when the file
    /// cannot be read or decoded.
    pub fn fingerprint(&self, path: &Path) -> Result<PerceptualFingerprint, PerceptualError> {
        if !is_image_path(path) {
            return Err(PerceptualError::UnsupportedFormat(
                path.display().to_string(),
            ));
        }
        let img = image::open(path)
            .map_err(|e| PerceptualError::LoadError(path.display().to_string(), e))?;

        let fingerprint = self.fingerprint_image(&img)?;
        log::trace!("{} {}: {}", self.algorithm, path.display(), fingerprint);
        Ok(fingerprint)
    }

    /// Compute the fingerprint of an already decoded image.
    ///
    /// # Errors
    ///
    /// Only fails if the configured hasher yields an unexpected width.
    pub fn fingerprint_image(
        &self,
        img: &DynamicImage,
    ) -> Result<PerceptualFingerprint, PerceptualError> {
        PerceptualFingerprint::from_image_hash(&self.hasher.hash_image(img))
    }

    /// Get the algorithm used by this hasher.
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::Phash)
    }
}
