//! Duplicate groups and the two grouping relations.
//!
//! # Overview
//!
//! Grouping takes fingerprinted files in discovery order and partitions them
//! with a [`DisjointSet`]:
//!
//! - [`group_exact`] joins files whose [`ContentDigest`] is equal. Every
//!   file is unioned with the first file seen carrying the same digest.
//! - [`group_similar`] joins images whose fingerprints are within the
//!   threshold, over all pairs. Groups are connected components, so a
//!   borderline image can link two images that are not similar to each
//!   other. Such groups report [`DuplicateGroup::is_chained`].
//!
//! Only classes with two or more members become groups. Groups are ordered
//! by their earliest-discovered member and members keep discovery order.
//!
//! # Example
//!
//! ```
//! use psamfinder::duplicates::group_exact;
//! use psamfinder::scanner::{ContentDigest, FileEntry};
//! use std::path::PathBuf;
//!
//! let same = ContentDigest::from_bytes([1; 32]);
//! let other = ContentDigest::from_bytes([2; 32]);
//! let files = vec![
//!     (FileEntry::new(PathBuf::from("/a.txt"), 3), same),
//!     (FileEntry::new(PathBuf::from("/b.txt"), 3), same),
//!     (FileEntry::new(PathBuf::from("/c.txt"), 5), other),
//! ];
//!
//! let groups = group_exact(files);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::union_find::DisjointSet;
use crate::scanner::{ContentDigest, FileEntry, PerceptualFingerprint};

/// Image count above which the quadratic pairwise pass is logged as slow.
pub const PAIRWISE_WARN_THRESHOLD: usize = 5_000;

/// How the members of a group are related.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKind {
    /// Byte-identical content.
    Exact {
        /// Digest shared by every member
        digest: ContentDigest,
    },
    /// Perceptually similar images.
    Similar {
        /// Similarity threshold the group was built with
        threshold: f64,
        /// Largest bit distance allowed between directly linked members
        allowed_bits: u32,
        /// Largest bit distance between any two members
        max_distance_bits: u32,
    },
}

/// A set of files considered duplicates of each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Relation between members
    #[serde(flatten)]
    pub kind: GroupKind,
    /// Members in discovery order (at least two)
    pub files: Vec<FileEntry>,
}

impl DuplicateGroup {
    /// Create a new group.
    #[must_use]
    pub fn new(kind: GroupKind, files: Vec<FileEntry>) -> Self {
        debug_assert!(files.len() >= 2, "a duplicate group needs two members");
        Self { kind, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Member paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths().any(|p| p == path)
    }

    /// Total size of all members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Bytes freed by keeping only the largest member.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        let largest = self.files.iter().map(|f| f.size).max().unwrap_or(0);
        self.total_size() - largest
    }

    /// Number of redundant copies (all members minus one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Check if this is a similarity-based group rather than an exact duplicate.
    #[must_use]
    pub fn is_similar(&self) -> bool {
        matches!(self.kind, GroupKind::Similar { .. })
    }

    /// Whether some members are linked only through intermediates.
    #[must_use]
    pub fn is_chained(&self) -> bool {
        match self.kind {
            GroupKind::Similar {
                allowed_bits,
                max_distance_bits,
                ..
            } => max_distance_bits > allowed_bits,
            GroupKind::Exact { .. } => false,
        }
    }

    /// Shared digest, for exact groups.
    #[must_use]
    pub fn digest(&self) -> Option<&ContentDigest> {
        match &self.kind {
            GroupKind::Exact { digest } => Some(digest),
            GroupKind::Similar { .. } => None,
        }
    }
}

/// Group files by content digest.
///
/// Input must be in discovery order; groups and members keep it.
#[must_use]
pub fn group_exact(entries: Vec<(FileEntry, ContentDigest)>) -> Vec<DuplicateGroup> {
    let mut set = DisjointSet::new(entries.len());
    let mut first_seen: HashMap<ContentDigest, usize> = HashMap::with_capacity(entries.len());

    for (i, (_, digest)) in entries.iter().enumerate() {
        match first_seen.get(digest) {
            Some(&first) => {
                set.union(first, i);
            }
            None => {
                first_seen.insert(*digest, i);
            }
        }
    }

    let digests: Vec<ContentDigest> = entries.iter().map(|(_, d)| *d).collect();
    let files: Vec<FileEntry> = entries.into_iter().map(|(f, _)| f).collect();

    let groups = collect_groups(&mut set, files, |members| GroupKind::Exact {
        digest: digests[members[0]],
    });
    log::debug!(
        "Exact grouping: {} files -> {} groups",
        digests.len(),
        groups.len()
    );
    groups
}

/// Group images whose fingerprints are at least `threshold` similar,
/// taking the transitive closure of that relation.
///
/// `threshold` is a similarity in `(0, 1]`; out-of-range values are clamped.
#[must_use]
pub fn group_similar(
    entries: Vec<(FileEntry, PerceptualFingerprint)>,
    threshold: f64,
) -> Vec<DuplicateGroup> {
    let n = entries.len();
    if n > PAIRWISE_WARN_THRESHOLD {
        log::warn!(
            "Comparing {} images pairwise ({} comparisons); this may take a while",
            n,
            n * (n - 1) / 2
        );
    }

    let allowed_bits = PerceptualFingerprint::max_distance_bits(threshold);
    let fingerprints: Vec<PerceptualFingerprint> = entries.iter().map(|(_, fp)| *fp).collect();

    let mut set = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if fingerprints[i].distance_bits(&fingerprints[j]) <= allowed_bits {
                set.union(i, j);
            }
        }
    }

    let files: Vec<FileEntry> = entries.into_iter().map(|(f, _)| f).collect();
    let groups = collect_groups(&mut set, files, |members| {
        let mut max_distance_bits = 0;
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                max_distance_bits =
                    max_distance_bits.max(fingerprints[a].distance_bits(&fingerprints[b]));
            }
        }
        GroupKind::Similar {
            threshold,
            allowed_bits,
            max_distance_bits,
        }
    });

    let chained = groups.iter().filter(|g| g.is_chained()).count();
    log::debug!(
        "Similar grouping (threshold {:.2}, {} bits): {} images -> {} groups ({} chained)",
        threshold,
        allowed_bits,
        n,
        groups.len(),
        chained
    );
    groups
}

/// Turn the partition into groups of two or more, moving files out of
/// `files` in index order.
fn collect_groups(
    set: &mut DisjointSet,
    files: Vec<FileEntry>,
    mut kind_for: impl FnMut(&[usize]) -> GroupKind,
) -> Vec<DuplicateGroup> {
    let classes: Vec<Vec<usize>> = set
        .classes()
        .into_iter()
        .filter(|members| members.len() >= 2)
        .collect();

    let mut slots: Vec<Option<FileEntry>> = files.into_iter().map(Some).collect();
    classes
        .into_iter()
        .map(|members| {
            let kind = kind_for(&members);
            let files = members
                .iter()
                .filter_map(|&i| slots[i].take())
                .collect();
            DuplicateGroup::new(kind, files)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(format!("/test/{name}")), size)
    }

    fn digest(b: u8) -> ContentDigest {
        ContentDigest::from_bytes([b; 32])
    }

    fn fp(bits: u64) -> PerceptualFingerprint {
        PerceptualFingerprint::from_bits(bits)
    }

    fn names(group: &DuplicateGroup) -> Vec<String> {
        group
            .paths()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_exact_pair_and_unique() {
        let groups = group_exact(vec![
            (entry("a", 10), digest(1)),
            (entry("b", 10), digest(1)),
            (entry("c", 10), digest(2)),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["a", "b"]);
        assert_eq!(groups[0].digest(), Some(&digest(1)));
        assert!(!groups[0].is_similar());
        assert!(!groups[0].is_chained());
    }

    #[test]
    fn test_exact_empty_and_all_unique() {
        assert!(group_exact(Vec::new()).is_empty());
        assert!(group_exact(vec![
            (entry("a", 1), digest(1)),
            (entry("b", 1), digest(2)),
        ])
        .is_empty());
    }

    #[test]
    fn test_exact_ordering_by_earliest_member() {
        let groups = group_exact(vec![
            (entry("p", 1), digest(7)),
            (entry("q", 1), digest(3)),
            (entry("r", 1), digest(3)),
            (entry("s", 1), digest(7)),
            (entry("t", 1), digest(3)),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(names(&groups[0]), vec!["p", "s"]);
        assert_eq!(names(&groups[1]), vec!["q", "r", "t"]);
    }

    #[test]
    fn test_similar_scenario_excludes_far_image() {
        // X and Y differ by 3 bits (~0.05); Z is 32 bits away from both.
        let groups = group_similar(
            vec![
                (entry("x.png", 1), fp(0)),
                (entry("y.png", 1), fp(0b111)),
                (entry("z.png", 1), fp(0xFFFF_FFFF)),
            ],
            0.9,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["x.png", "y.png"]);
        assert!(groups[0].is_similar());
        assert_eq!(groups[0].digest(), None);
        assert!(!groups[0].is_chained());
    }

    #[test]
    fn test_similar_chaining() {
        // a-b and b-c are 6 bits apart, a-c is 12: one chained group at 0.9.
        let groups = group_similar(
            vec![
                (entry("a.png", 1), fp(0)),
                (entry("b.png", 1), fp(0b11_1111)),
                (entry("c.png", 1), fp(0b1111_1111_1111)),
            ],
            0.9,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert!(groups[0].is_chained());
        match groups[0].kind {
            GroupKind::Similar {
                allowed_bits,
                max_distance_bits,
                ..
            } => {
                assert_eq!(allowed_bits, 6);
                assert_eq!(max_distance_bits, 12);
            }
            GroupKind::Exact { .. } => panic!("expected a similar group"),
        }
    }

    #[test]
    fn test_similar_threshold_one_requires_identical() {
        let groups = group_similar(
            vec![
                (entry("a.png", 1), fp(42)),
                (entry("b.png", 1), fp(43)),
                (entry("c.png", 1), fp(42)),
            ],
            1.0,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_group_sizes() {
        let group = DuplicateGroup::new(
            GroupKind::Exact { digest: digest(0) },
            vec![entry("a", 100), entry("b", 100), entry("c", 100)],
        );

        assert_eq!(group.total_size(), 300);
        assert_eq!(group.reclaimable_space(), 200);
        assert_eq!(group.duplicate_count(), 2);
        assert!(group.contains(Path::new("/test/b")));
        assert!(!group.contains(Path::new("/test/z")));
    }

    #[test]
    fn test_group_serializes_kind_inline() {
        let group = DuplicateGroup::new(
            GroupKind::Exact { digest: digest(0xab) },
            vec![entry("a", 1), entry("b", 1)],
        );
        let json = serde_json::to_value(&group).unwrap();

        assert_eq!(json["kind"], "exact");
        assert_eq!(json["digest"], "ab".repeat(32));
        assert_eq!(json["files"].as_array().unwrap().len(), 2);
    }
}
