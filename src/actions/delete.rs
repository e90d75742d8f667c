//! Executing deletion plans.
//!
//! # Overview
//!
//! [`execute_deletion`] consumes the plans built by
//! [`plan_deletion`](super::plan::plan_deletion) and removes every file a
//! plan lists for removal, either permanently (`remove_file`, the default)
//! or by moving it to the system trash.
//!
//! # Safety
//!
//! - Skipped groups are never touched.
//! - Before removing anything from a group, the kept file must still exist.
//!   If it is gone, every removal in that group fails with
//!   [`DeleteError::KeptFileMissing`] so the last copy is never destroyed.
//! - A failed removal is reported and the remaining files and groups are
//!   still processed.
//! - A dry run performs the same checks and reports
//!   [`DeletionStatus::WouldRemove`] without mutating the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::plan::{DeletionPlan, GroupResolution, GroupState};
use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Errors that can occur during file deletion.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File not found (may have been deleted externally).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when trying to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The file chosen to keep no longer exists.
    #[error("kept file {kept} no longer exists; not removing {path}")]
    KeptFileMissing {
        /// The file that was supposed to stay
        kept: PathBuf,
        /// The file that was not removed
        path: PathBuf,
    },

    /// Failed to move file to trash.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// Path that failed
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Permanent removal failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where error occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// How files are removed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMethod {
    /// `remove_file`; not recoverable.
    #[default]
    Permanent,
    /// Move to the platform trash / recycle bin.
    Trash,
}

/// Options for [`execute_deletion`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Removal method.
    pub method: DeleteMethod,
}

impl DeleteOptions {
    /// Dry-run options.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Set the removal method.
    #[must_use]
    pub fn with_method(mut self, method: DeleteMethod) -> Self {
        self.method = method;
        self
    }
}

/// Result for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeletionStatus {
    /// The file was removed.
    Removed,
    /// Dry run: the file would have been removed.
    WouldRemove,
    /// The file was not removed.
    Failed(String),
}

/// What happened to one planned removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    /// Zero-based group index
    pub group: usize,
    /// The file
    pub path: PathBuf,
    /// Size recorded at scan time
    pub size: u64,
    /// Result
    #[serde(flatten)]
    pub status: DeletionStatus,
}

/// Remove a single file with `method`, returning its size.
///
/// # Errors
///
/// [`DeleteError`] if the file cannot be inspected or removed.
pub fn remove_file(path: &Path, method: DeleteMethod) -> Result<u64, DeleteError> {
    let size = fs::symlink_metadata(path)
        .map_err(|e| DeleteError::from_io(path, e))?
        .len();

    match method {
        DeleteMethod::Permanent => {
            fs::remove_file(path).map_err(|e| {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                DeleteError::from_io(path, e)
            })?;
            log::info!("Deleted: {} ({})", path.display(), ByteSize(size));
        }
        DeleteMethod::Trash => {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                DeleteError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::info!("Moved to trash: {} ({})", path.display(), ByteSize(size));
        }
    }
    Ok(size)
}

/// Carry out `plans`. Returns one outcome per planned removal, in plan
/// order; skipped groups produce none.
///
/// Every failure is also reported to `sink` as a `DeletionFailure`.
pub fn execute_deletion(
    plans: Vec<DeletionPlan>,
    options: &DeleteOptions,
    sink: &dyn DiagnosticSink,
) -> Vec<DeletionOutcome> {
    let mut outcomes = Vec::new();

    for plan in plans {
        let (group, resolution) = plan.into_parts();
        let (keep, remove) = match resolution {
            GroupResolution::Keep { keep, remove } => (keep, remove),
            GroupResolution::Skip { reason } => {
                log::debug!("Group {} {:?}: {}", group + 1, GroupState::Skipped, reason);
                continue;
            }
        };

        let kept_exists = fs::symlink_metadata(&keep.path).is_ok();
        for file in remove {
            let status = if !kept_exists {
                Err(DeleteError::KeptFileMissing {
                    kept: keep.path.clone(),
                    path: file.path.clone(),
                })
            } else if options.dry_run {
                fs::symlink_metadata(&file.path)
                    .map(|_| DeletionStatus::WouldRemove)
                    .map_err(|e| DeleteError::from_io(&file.path, e))
            } else {
                remove_file(&file.path, options.method).map(|_| DeletionStatus::Removed)
            };

            let status = status.unwrap_or_else(|e| {
                sink.report(Diagnostic::deletion_failure(&file.path, e.to_string()));
                DeletionStatus::Failed(e.to_string())
            });
            outcomes.push(DeletionOutcome {
                group,
                path: file.path,
                size: file.size,
                status,
            });
        }
        log::debug!("Group {} {:?}", group + 1, GroupState::Executed);
    }

    outcomes
}

/// Totals over a set of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    /// Files removed
    pub removed: usize,
    /// Files that would be removed (dry run)
    pub would_remove: usize,
    /// Files that could not be removed
    pub failed: usize,
    /// Bytes freed (or that would be freed)
    pub bytes: u64,
}

impl DeletionSummary {
    /// Tally `outcomes`.
    #[must_use]
    pub fn from_outcomes(outcomes: &[DeletionOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.status {
                DeletionStatus::Removed => {
                    acc.removed += 1;
                    acc.bytes += o.size;
                }
                DeletionStatus::WouldRemove => {
                    acc.would_remove += 1;
                    acc.bytes += o.size;
                }
                DeletionStatus::Failed(_) => acc.failed += 1,
            }
            acc
        })
    }
}
