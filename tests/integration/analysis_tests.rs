use psamfinder::analysis::{AnalysisError, AnalyzerConfig, SimilarityAnalyzer};
use psamfinder::diagnostics::{DiagnosticKind, DiagnosticLog};
use tempfile::tempdir;

use super::support::{write_file, write_pattern_image};

#[test]
fn test_report_over_three_images() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "a.png", 1, 256);
    write_pattern_image(dir.path(), "b.png", 1, 128);
    write_pattern_image(dir.path(), "c.png", 2, 256);
    write_file(dir.path(), "readme.md", b"ignored");

    let report = psamfinder::analyze_similarity(dir.path(), 300, false).unwrap();

    assert_eq!(report.images_sampled, 3);
    assert_eq!(report.images_fingerprinted, 3);
    assert_eq!(report.pairs.len(), 3);
    assert!(report.is_sufficient());
    assert!(report.closest_pairs.is_empty());

    // Closest pair first: the resized copy.
    let first = &report.pairs[0];
    assert!(first.path_a.ends_with("a.png"));
    assert!(first.path_b.ends_with("b.png"));
    assert!(report.pairs.windows(2).all(|w| w[0].distance_bits <= w[1].distance_bits));

    let stats = report.stats.as_ref().unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.min_bits, first.distance_bits);

    let suggested = report.suggested_threshold.unwrap();
    assert!((0.70..=0.95).contains(&suggested));
    assert_eq!(report.histogram.iter().map(|b| b.count).sum::<usize>(), 3);
}

#[test]
fn test_max_images_caps_sample() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write_pattern_image(dir.path(), &format!("img{i}.png"), i, 32);
    }

    let report = psamfinder::analyze_similarity(dir.path(), 2, false).unwrap();
    assert_eq!(report.images_sampled, 2);
    assert_eq!(report.pairs.len(), 1);

    let report = psamfinder::analyze_similarity(dir.path(), 0, false).unwrap();
    assert_eq!(report.images_sampled, 5);
    assert_eq!(report.pairs.len(), 10);
}

#[test]
fn test_verbose_includes_closest_pairs() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        write_pattern_image(dir.path(), &format!("img{i}.png"), i, 32);
    }

    let report = psamfinder::analyze_similarity(dir.path(), 0, true).unwrap();
    assert_eq!(report.pairs.len(), 15);
    assert_eq!(report.closest_pairs.len(), 10);
    assert_eq!(report.closest_pairs[..], report.pairs[..10]);
}

#[test]
fn test_too_few_images() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "only.png", 1, 32);
    write_file(dir.path(), "broken.jpg", b"nope");

    let log = DiagnosticLog::new();
    let report = SimilarityAnalyzer::new(AnalyzerConfig::default())
        .analyze(dir.path(), &log)
        .unwrap();

    assert_eq!(report.images_sampled, 2);
    assert_eq!(report.images_fingerprinted, 1);
    assert!(!report.is_sufficient());
    assert!(report.pairs.is_empty());
    assert!(report.stats.is_none());
    assert!(report.suggested_threshold.is_none());
    assert_eq!(log.count(DiagnosticKind::Decode), 1);
}

#[test]
fn test_identical_images_suggest_strict_threshold() {
    let dir = tempdir().unwrap();
    write_pattern_image(dir.path(), "one.png", 4, 64);
    write_pattern_image(dir.path(), "two.png", 4, 64);

    let report = psamfinder::analyze_similarity(dir.path(), 300, false).unwrap();
    assert_eq!(report.suggested_threshold, Some(0.95));
}

#[test]
fn test_invalid_directory() {
    let dir = tempdir().unwrap();
    let err = psamfinder::analyze_similarity(dir.path().join("missing"), 300, false).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidDirectory(_)));
}
