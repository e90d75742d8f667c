//! Layered application settings.
//!
//! Values are merged with `figment`, later layers winning:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. a TOML file: the `--config` path, else `psamfinder.toml` in the
//!    platform config directory (if it exists)
//! 3. environment variables prefixed `PSAMFINDER_`
//!    (e.g. `PSAMFINDER_IO_THREADS=8`)
//! 4. command-line flags ([`ConfigOverrides`])
//!
//! ```toml
//! similarity_threshold = 0.85
//! hash_algorithm = "blake3"
//! io_threads = 8
//! use_trash = true
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::DEFAULT_MAX_IMAGES;
use crate::duplicates::{DEFAULT_IO_THREADS, DEFAULT_SIMILARITY_THRESHOLD};
use crate::scanner::{DigestAlgorithm, PerceptualAlgorithm};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "psamfinder.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PSAMFINDER_";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file named on the command line does not exist.
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    /// A layer could not be parsed or has a value of the wrong type.
    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    /// `similarity_threshold` outside `(0, 1]`.
    #[error("similarity_threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    /// `io_threads` set to zero.
    #[error("io_threads must be at least 1")]
    InvalidIoThreads,
}

/// Effective settings after all layers are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fuzzy-mode similarity threshold.
    pub similarity_threshold: f64,
    /// Image cap for the `threshold` command (0 = no limit).
    pub max_images: usize,
    /// Digest used in exact mode.
    pub hash_algorithm: DigestAlgorithm,
    /// Fingerprint used in fuzzy mode and analysis.
    pub perceptual_algorithm: PerceptualAlgorithm,
    /// Hashing pool size.
    pub io_threads: usize,
    /// Move removed files to the trash instead of deleting them.
    pub use_trash: bool,
    /// Skip dot-files and dot-directories below the root.
    pub skip_hidden: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_images: DEFAULT_MAX_IMAGES,
            hash_algorithm: DigestAlgorithm::default(),
            perceptual_algorithm: PerceptualAlgorithm::default(),
            io_threads: DEFAULT_IO_THREADS,
            use_trash: false,
            skip_hidden: false,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    /// `--similarity-threshold`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    /// `--max-images`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_images: Option<usize>,
    /// `--hash`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<DigestAlgorithm>,
    /// `--algorithm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_algorithm: Option<PerceptualAlgorithm>,
    /// `--io-threads`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    /// `--trash`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_trash: Option<bool>,
    /// `--skip-hidden`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
}

impl Settings {
    /// Default location of the config file, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "psamfinder").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Defaults, file and environment layers, without validation.
    ///
    /// A missing file is treated as empty.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load settings from every layer and validate them.
    ///
    /// `config_file` is an explicit `--config` path, which must exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the explicit file is missing, a layer cannot be
    /// parsed, or a value is out of range.
    pub fn load(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        if let Some(path) = file.as_deref().filter(|p| p.is_file()) {
            log::debug!("Reading configuration from {}", path.display());
        }

        let figment = Self::figment(file.as_deref()).merge(Serialized::defaults(overrides));
        Self::from_figment(&figment)
    }

    /// Extract and validate.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] on a parse failure or an out-of-range value.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let settings: Self = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidThreshold`] or [`ConfigError::InvalidIoThreads`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ConfigError::InvalidThreshold(t));
        }
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidIoThreads);
        }
        Ok(())
    }
}
