//! Progress reporting utilities using indicatif.
//!
//! The scan pipeline reports through the [`ProgressCallback`] trait so the
//! core never touches the terminal. [`Progress`] implements it with a
//! spinner for the walk and a bar for hashing or fingerprinting.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for the directory walk.
pub const PHASE_WALKING: &str = "walking";
/// Phase name for content hashing.
pub const PHASE_HASHING: &str = "hashing";
/// Phase name for perceptual fingerprinting.
pub const PHASE_FINGERPRINTING: &str = "fingerprinting";

/// Callback trait for progress reporting.
///
/// Implementations must be thread-safe, since hashing reports from the
/// worker pool.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts. `total` is 0 when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called after each item, with the running count and the item's path.
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase ends.
    fn on_phase_end(&self, phase: &str);
}

/// Terminal progress display.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    work: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a display; with `quiet` every callback is a no-op.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            work: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn work_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

fn lock(slot: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        if phase == PHASE_WALKING {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::walking_style());
            pb.set_message("Walking directory");
            pb.enable_steady_tick(Duration::from_millis(100));
            *lock(&self.walking) = Some(pb);
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::work_style());
            pb.set_message(capitalize(phase));
            *lock(&self.work) = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let message = truncate_path(path, 30);
        if let Some(ref pb) = *lock(&self.work) {
            pb.set_position(current as u64);
            pb.set_message(message);
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_position(current as u64);
            pb.set_message(message);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let slot = if phase == PHASE_WALKING {
            &self.walking
        } else {
            &self.work
        };
        if let Some(pb) = lock(slot).take() {
            pb.finish_and_clear();
        }
    }
}

fn capitalize(phase: &str) -> String {
    let mut chars = phase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        let tail: String = file_name
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
