//! Non-interactive keep selection.
//!
//! A [`KeepPolicy`] picks the file to keep in each group without asking,
//! producing the same [`KeepSelection`] values the prompt would. Ties go to
//! the earliest member in group order.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::plan::KeepSelection;
use crate::duplicates::DuplicateGroup;
use crate::scanner::FileEntry;

/// Rule for choosing the file to keep.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    /// First file in group order (sorted path order from the walk).
    #[default]
    First,
    /// Most recently modified file.
    Newest,
    /// Least recently modified file.
    Oldest,
    /// Largest file.
    Largest,
}

impl KeepPolicy {
    /// Selection for one group.
    ///
    /// `Newest` and `Oldest` ignore members without a modification time and
    /// fall back to the first member when none has one.
    #[must_use]
    pub fn select(self, group: &DuplicateGroup) -> KeepSelection {
        let index = match self {
            Self::First => Some(0),
            Self::Newest => best_index(&group.files, modified, |a, b| a > b),
            Self::Oldest => best_index(&group.files, modified, |a, b| a < b),
            Self::Largest => best_index(&group.files, |f| Some(f.size), |a, b| a > b),
        };
        KeepSelection::Keep(index.unwrap_or(0) + 1)
    }
}

fn modified(file: &FileEntry) -> Option<SystemTime> {
    file.modified
}

/// Index of the first member whose key beats every earlier one.
fn best_index<K, F, B>(files: &[FileEntry], key: F, better: B) -> Option<usize>
where
    F: Fn(&FileEntry) -> Option<K>,
    B: Fn(&K, &K) -> bool,
{
    let mut best: Option<(usize, K)> = None;
    for (i, file) in files.iter().enumerate() {
        let Some(k) = key(file) else { continue };
        match &best {
            Some((_, current)) if !better(&k, current) => {}
            _ => best = Some((i, k)),
        }
    }
    best.map(|(i, _)| i)
}

/// One selection per group, in group order.
#[must_use]
pub fn select_by_policy(groups: &[DuplicateGroup], policy: KeepPolicy) -> Vec<KeepSelection> {
    groups.iter().map(|g| policy.select(g)).collect()
}
