use psamfinder::diagnostics::{DiagnosticKind, DiagnosticLog};
use psamfinder::duplicates::{DuplicateFinder, FinderConfig, FinderError, GroupKind};
use psamfinder::scanner::{PerceptualAlgorithm, PerceptualHasher};
use std::path::Path;
use tempfile::tempdir;

use super::support::{write_file, write_pattern_image};

fn fuzzy(threshold: f64) -> DuplicateFinder {
    DuplicateFinder::new(
        FinderConfig::default()
            .with_fuzzy(true)
            .with_threshold(threshold),
    )
}

fn names(group: &psamfinder::duplicates::DuplicateGroup) -> Vec<String> {
    group
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_fixture_distances() {
    let dir = tempdir().unwrap();
    let x = write_pattern_image(dir.path(), "x.png", 1, 256);
    let y = write_pattern_image(dir.path(), "y.png", 1, 128);
    let z = write_pattern_image(dir.path(), "z.png", 2, 256);

    let hasher = PerceptualHasher::default();
    let (fx, fy, fz) = (
        hasher.fingerprint(&x).unwrap(),
        hasher.fingerprint(&y).unwrap(),
        hasher.fingerprint(&z).unwrap(),
    );

    assert!(fx.distance_bits(&fy) <= 6, "resized copy drifted: {}", fx.distance_bits(&fy));
    assert!(fx.distance_bits(&fz) > 12, "unrelated images too close: {}", fx.distance_bits(&fz));
    assert!(fy.distance_bits(&fz) > 12);
}

#[test]
fn test_resized_copy_grouped_unrelated_excluded() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "x.png", 1, 256);
    write_pattern_image(dir.path(), "y.png", 1, 128);
    write_pattern_image(dir.path(), "z.png", 2, 256);

    let log = DiagnosticLog::new();
    let (groups, summary) = fuzzy(0.9).find_duplicates(dir.path(), &log).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["x.png", "y.png"]);
    assert!(matches!(
        groups[0].kind,
        GroupKind::Similar { allowed_bits: 6, .. }
    ));
    assert_eq!(summary.files_fingerprinted, 3);
    assert!(log.is_empty());
}

#[test]
fn test_same_picture_different_formats() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "photo.png", 7, 200);
    write_pattern_image(dir.path(), "photo.bmp", 7, 200);

    let groups = psamfinder::find_duplicates(dir.path(), true, 1.0).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_non_images_ignored_and_corrupt_reported() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "a.png", 3, 64);
    write_pattern_image(dir.path(), "b.png", 3, 96);
    write_file(dir.path(), "notes.txt", b"same");
    write_file(dir.path(), "notes2.txt", b"same");
    write_file(dir.path(), "broken.png", b"this is not an image");

    let log = DiagnosticLog::new();
    let (groups, summary) = fuzzy(0.8).find_duplicates(dir.path(), &log).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["a.png", "b.png"]);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(log.count(DiagnosticKind::Decode), 1);
    assert!(log.snapshot()[0]
        .path()
        .is_some_and(|p: &Path| p.ends_with("broken.png")));
}

#[test]
fn test_raising_threshold_never_grows_groups() {
    let dir = tempdir().unwrap();
    for (i, seed) in [10u64, 10, 11, 12, 12, 13].iter().enumerate() {
        let size = 64 + 32 * i as u32;
        write_pattern_image(dir.path(), &format!("img{i}.png"), *seed, size);
    }

    let log = DiagnosticLog::new();
    let mut previous: Option<Vec<Vec<String>>> = None;
    for threshold in [0.7, 0.8, 0.9, 0.95, 1.0] {
        let groups: Vec<Vec<String>> = fuzzy(threshold)
            .find_duplicates(dir.path(), &log)
            .unwrap()
            .0
            .iter()
            .map(names)
            .collect();

        if let Some(looser) = &previous {
            for group in &groups {
                assert!(
                    looser.iter().any(|g| group.iter().all(|m| g.contains(m))),
                    "group {group:?} at {threshold} not contained in a looser group"
                );
            }
        }
        previous = Some(groups);
    }
}

#[test]
fn test_algorithms_all_group_resized_copy() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "big.png", 21, 256);
    write_pattern_image(dir.path(), "small.png", 21, 64);

    let log = DiagnosticLog::new();
    for algorithm in [
        PerceptualAlgorithm::Phash,
        PerceptualAlgorithm::Dhash,
        PerceptualAlgorithm::Ahash,
    ] {
        let finder = DuplicateFinder::new(
            FinderConfig::default()
                .with_fuzzy(true)
                .with_threshold(0.8)
                .with_perceptual_algorithm(algorithm),
        );
        let groups = finder.find_duplicates(dir.path(), &log).unwrap().0;
        assert_eq!(groups.len(), 1, "{algorithm}");
    }
}

#[test]
fn test_invalid_threshold_rejected_in_fuzzy_mode() {
    let dir = tempdir().unwrap();
    for bad in [0.0, -0.1, 1.01] {
        let err = psamfinder::find_duplicates(dir.path(), true, bad).unwrap_err();
        assert!(matches!(err, FinderError::InvalidThreshold(_)));
    }
    // Ignored in exact mode.
    assert!(psamfinder::find_duplicates(dir.path(), false, 5.0).is_ok());
}
