//! Command-line interface definitions for psamfinder.
//!
//! Global options (verbosity, config file, color) come first, followed by
//! one of two subcommands:
//!
//! ```bash
//! # List exact duplicates
//! psamfinder scan ~/Pictures
//!
//! # Near-duplicate images, then choose what to keep for each group
//! psamfinder scan ~/Pictures --fuzzy-images --similarity-threshold 0.85 --delete
//!
//! # Remove everything but the newest copy, without prompting, to the trash
//! psamfinder scan ~/Downloads --delete --keep newest --trash --yes
//!
//! # Help choosing a threshold
//! psamfinder threshold ~/Pictures --verbose-report
//! ```
//!
//! Flags left unset fall back to the config file and `PSAMFINDER_*`
//! environment variables (see [`crate::config`]).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::actions::KeepPolicy;
use crate::config::ConfigOverrides;
use crate::scanner::{DigestAlgorithm, PerceptualAlgorithm};

/// Find exact and near-duplicate files and remove redundant copies.
#[derive(Debug, Parser)]
#[command(name = "psamfinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress everything except results and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: psamfinder.toml in the platform config dir)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether the selected subcommand renders JSON.
    #[must_use]
    pub fn json_output(&self) -> bool {
        let output = match &self.command {
            Commands::Scan(args) => args.output,
            Commands::Threshold(args) => args.output,
        };
        output == OutputFormat::Json
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory (recursively) for duplicate files
    Scan(ScanArgs),
    /// Analyze pairwise image similarity to help choose --similarity-threshold
    Threshold(ThresholdArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// After listing duplicates, choose a file to keep in each group and remove the rest
    #[arg(short, long)]
    pub delete: bool,

    /// Show which files would be removed without touching anything (implies --delete)
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Group images by perceptual similarity instead of exact content
    #[arg(long)]
    pub fuzzy_images: bool,

    /// Similarity threshold for --fuzzy-images, in (0, 1] [default: 0.80]
    ///
    /// Try 0.75-0.85 for resized or recompressed photos.
    #[arg(long, value_name = "T", value_parser = parse_threshold)]
    pub similarity_threshold: Option<f64>,

    /// Choose the file to keep automatically instead of prompting
    #[arg(long, value_enum, value_name = "POLICY")]
    pub keep: Option<KeepPolicy>,

    /// Move removed files to the system trash instead of deleting them
    #[arg(long)]
    pub trash: bool,

    /// Do not ask for confirmation before removing files
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Content digest for exact mode [default: sha256]
    #[arg(long = "hash", value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<DigestAlgorithm>,

    /// Perceptual fingerprint for fuzzy mode [default: phash]
    #[arg(long = "algorithm", value_enum, value_name = "ALGORITHM")]
    pub perceptual_algorithm: Option<PerceptualAlgorithm>,

    /// Number of threads used for hashing [default: 4]
    #[arg(long, value_name = "N", value_parser = parse_threads)]
    pub io_threads: Option<usize>,

    /// Skip hidden files and directories (starting with .) below DIR
    #[arg(long)]
    pub skip_hidden: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl ScanArgs {
    /// Whether the deletion workflow runs.
    #[must_use]
    pub fn wants_deletion(&self) -> bool {
        self.delete || self.dry_run
    }

    /// Flags that override configuration values.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            similarity_threshold: self.similarity_threshold,
            hash_algorithm: self.hash_algorithm,
            perceptual_algorithm: self.perceptual_algorithm,
            io_threads: self.io_threads,
            use_trash: self.trash.then_some(true),
            skip_hidden: self.skip_hidden.then_some(true),
            ..ConfigOverrides::default()
        }
    }
}

/// Arguments for the threshold subcommand.
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// Directory to analyze
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Maximum number of images to process; 0 = no limit [default: 300]
    #[arg(long, value_name = "N")]
    pub max_images: Option<usize>,

    /// Show the closest pairs and the distance distribution
    #[arg(long)]
    pub verbose_report: bool,

    /// Perceptual fingerprint to analyze [default: phash]
    #[arg(long = "algorithm", value_enum, value_name = "ALGORITHM")]
    pub perceptual_algorithm: Option<PerceptualAlgorithm>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl ThresholdArgs {
    /// Flags that override configuration values.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_images: self.max_images,
            perceptual_algorithm: self.perceptual_algorithm,
            ..ConfigOverrides::default()
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored text
    Text,
    /// JSON document on stdout
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a similarity threshold in `(0, 1]`.
///
/// ```
/// use psamfinder::cli::parse_threshold;
///
/// assert_eq!(parse_threshold("0.85").unwrap(), 0.85);
/// assert!(parse_threshold("0").is_err());
/// ```
///
/// # Errors
///
/// Returns an error for non-numbers and values outside `(0, 1]`.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("Threshold must be in (0, 1], got {value}"))
    }
}

/// Parse a thread count of at least 1.
///
/// # Errors
///
/// Returns an error for non-numbers and zero.
pub fn parse_threads(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("At least one thread is required".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("Invalid thread count: '{s}'")),
    }
}
