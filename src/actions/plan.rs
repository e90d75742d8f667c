//! Per-group deletion planning.
//!
//! # State machine
//!
//! Every group moves through
//!
//! ```text
//! Presented ──valid index──▶ KeepSelected ──execute──▶ Executed
//!     │
//!     └──skip / invalid / missing──▶ Skipped
//! ```
//!
//! [`plan_deletion`] performs the first transition for all groups at once.
//! A [`DeletionPlan`] can only be built here and is consumed by
//! [`execute_deletion`](super::delete::execute_deletion), so nothing is ever
//! removed for a group whose selection was not resolved to a valid index.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::duplicates::DuplicateGroup;
use crate::scanner::FileEntry;

/// The user's answer for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepSelection {
    /// Keep the member at this 1-based index, remove the rest.
    Keep(usize),
    /// Keep every member.
    Skip,
    /// Input that is neither an index nor a skip.
    Invalid(SelectionError),
}

impl KeepSelection {
    /// Parse one line of user input.
    ///
    /// `skip` in any case means [`KeepSelection::Skip`]; a positive or zero
    /// integer means [`KeepSelection::Keep`] (range is checked against the
    /// group later); anything else is [`KeepSelection::Invalid`].
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("skip") {
            return Self::Skip;
        }
        if trimmed.is_empty() {
            return Self::Invalid(SelectionError::Empty);
        }
        match trimmed.parse::<usize>() {
            Ok(index) => Self::Keep(index),
            Err(_) => Self::Invalid(SelectionError::NotANumber(trimmed.to_string())),
        }
    }
}

impl FromStr for KeepSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Why a selection could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Empty input.
    #[error("no selection entered")]
    Empty,

    /// Input was not an integer.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// Index outside `1..=len`.
    #[error("index {index} is out of range 1..={len}")]
    OutOfRange {
        /// The index given
        index: usize,
        /// Group size
        len: usize,
    },
}

/// Why a group was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The user chose to keep every file.
    UserSkipped,
    /// No selection was provided for this group.
    NoSelection,
    /// The selection was invalid.
    InvalidSelection {
        /// What was wrong
        #[serde(serialize_with = "serialize_display")]
        error: SelectionError,
    },
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserSkipped => write!(f, "skipped by user"),
            Self::NoSelection => write!(f, "no selection"),
            Self::InvalidSelection { error } => write!(f, "invalid selection: {error}"),
        }
    }
}

/// Position of a group in the deletion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    /// Shown to the user, no answer yet.
    Presented,
    /// A valid keep index was chosen.
    KeepSelected,
    /// Removals were carried out (or simulated).
    Executed,
    /// Nothing will be touched.
    Skipped,
}

/// Planned action for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GroupResolution {
    /// Keep one file, remove the others.
    Keep {
        /// The file that stays
        keep: FileEntry,
        /// The files to remove, in group order
        remove: Vec<FileEntry>,
    },
    /// Leave the group alone.
    Skip {
        /// Why
        reason: SkipReason,
    },
}

/// A resolved plan for one group. Only [`plan_deletion`] creates these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionPlan {
    group: usize,
    #[serde(flatten)]
    resolution: GroupResolution,
}

impl DeletionPlan {
    /// Zero-based index of the group this plan is for.
    #[must_use]
    pub fn group(&self) -> usize {
        self.group
    }

    /// The planned action.
    #[must_use]
    pub fn resolution(&self) -> &GroupResolution {
        &self.resolution
    }

    /// `KeepSelected` or `Skipped`.
    #[must_use]
    pub fn state(&self) -> GroupState {
        match self.resolution {
            GroupResolution::Keep { .. } => GroupState::KeepSelected,
            GroupResolution::Skip { .. } => GroupState::Skipped,
        }
    }

    /// The kept file, if any.
    #[must_use]
    pub fn kept(&self) -> Option<&FileEntry> {
        match &self.resolution {
            GroupResolution::Keep { keep, .. } => Some(keep),
            GroupResolution::Skip { .. } => None,
        }
    }

    /// Files slated for removal (empty when skipped).
    #[must_use]
    pub fn to_remove(&self) -> &[FileEntry] {
        match &self.resolution {
            GroupResolution::Keep { remove, .. } => remove,
            GroupResolution::Skip { .. } => &[],
        }
    }

    pub(crate) fn into_parts(self) -> (usize, GroupResolution) {
        (self.group, self.resolution)
    }
}

/// Resolve one group against its selection.
fn resolve(group: &DuplicateGroup, selection: Option<&KeepSelection>) -> GroupResolution {
    let error = match selection {
        None => {
            return GroupResolution::Skip {
                reason: SkipReason::NoSelection,
            }
        }
        Some(KeepSelection::Skip) => {
            return GroupResolution::Skip {
                reason: SkipReason::UserSkipped,
            }
        }
        Some(KeepSelection::Invalid(error)) => error.clone(),
        Some(&KeepSelection::Keep(index)) => {
            if (1..=group.len()).contains(&index) {
                let keep_at = index - 1;
                let keep = group.files[keep_at].clone();
                let remove = group
                    .files
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != keep_at)
                    .map(|(_, f)| f.clone())
                    .collect();
                return GroupResolution::Keep { keep, remove };
            }
            SelectionError::OutOfRange {
                index,
                len: group.len(),
            }
        }
    };
    GroupResolution::Skip {
        reason: SkipReason::InvalidSelection { error },
    }
}

/// Build one plan per group from `selections[i]` for group `i`.
///
/// Groups beyond the end of `selections` are skipped with
/// [`SkipReason::NoSelection`]. Invalid selections skip their group and
/// emit an `InvalidSelection` diagnostic.
pub fn plan_deletion(
    groups: &[DuplicateGroup],
    selections: &[KeepSelection],
    sink: &dyn DiagnosticSink,
) -> Vec<DeletionPlan> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let resolution = resolve(group, selections.get(i));
            match &resolution {
                GroupResolution::Skip {
                    reason: SkipReason::InvalidSelection { error },
                } => sink.report(Diagnostic::invalid_selection(i, error.to_string())),
                GroupResolution::Skip { reason } => {
                    log::debug!("Group {}: {}", i + 1, reason);
                }
                GroupResolution::Keep { keep, remove } => log::debug!(
                    "Group {}: keep {}, remove {}",
                    i + 1,
                    keep.path.display(),
                    remove.len()
                ),
            }
            DeletionPlan {
                group: i,
                resolution,
            }
        })
        .collect()
}
