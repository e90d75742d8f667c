//! Streaming content hasher for exact duplicate detection.
//!
//! # Overview
//! [`ContentHasher`] reads a file in fixed [`CHUNK_SIZE`] chunks and feeds them
//! to SHA-256 (default) or BLAKE3. Both produce a 32-byte [`ContentDigest`], so
//! memory use is bounded regardless of file size and the digest space is wide
//! enough that accidental collisions are not a practical concern.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::HashError;

/// Read buffer size used when streaming file content.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Digest algorithm used for exact-mode fingerprints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3, considerably faster on large files
    Blake3,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// A 256-bit content digest.
///
/// Serialized as its 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal representation (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        self.0.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }

    /// Parse a 64-character hex string (either case).
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut out = [0u8; 32];
        for (byte, pair) in out.iter_mut().zip(hex.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *byte = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Self(out))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid digest: {hex}")))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

/// Computes content digests for files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: DigestAlgorithm,
}

impl ContentHasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher uses.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read. The caller
    /// is expected to report the failure and leave the file out of grouping.
    pub fn hash_file(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let digest = self
            .hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))?;
        log::trace!("{} {}: {}", self.algorithm, path.display(), digest);
        Ok(digest)
    }

    /// Hash everything `reader` yields.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, reader: R) -> io::Result<ContentDigest> {
        match self.algorithm {
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                stream_chunks(reader, |chunk| hasher.update(chunk))?;
                let mut out = [0u8; 32];
                out.copy_from_slice(&hasher.finalize());
                Ok(ContentDigest(out))
            }
            DigestAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                stream_chunks(reader, |chunk| {
                    hasher.update(chunk);
                })?;
                Ok(ContentDigest(*hasher.finalize().as_bytes()))
            }
        }
    }
}

fn stream_chunks<R: Read>(mut reader: R, mut sink: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => sink(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
