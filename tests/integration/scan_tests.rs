use psamfinder::diagnostics::{DiagnosticKind, DiagnosticLog};
use psamfinder::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use psamfinder::scanner::{DigestAlgorithm, FileEntry, WalkerConfig};
use tempfile::tempdir;

use super::support::write_file;

fn names(group: &psamfinder::duplicates::DuplicateGroup) -> Vec<String> {
    group
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let log = DiagnosticLog::new();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.files_discovered, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert!(log.is_empty());
}

#[test]
fn test_identical_pair_and_unique_file() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "A.txt", b"hello world");
    write_file(dir.path(), "B.txt", b"hello world");
    write_file(dir.path(), "C.txt", b"hello there");

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["A.txt", "B.txt"]);
    assert!(groups[0].digest().is_some());
}

#[test]
fn test_nested_directories_group_across_levels() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "top.bin", b"payload");
    write_file(dir.path(), "sub/inner.bin", b"payload");
    write_file(dir.path(), "sub/deeper/last.bin", b"payload");
    write_file(dir.path(), "sub/other.bin", b"unrelated");

    let log = DiagnosticLog::new();
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();

    assert_eq!(groups.len(), 1);
    // Walk order: per-directory sorted, depth first.
    assert_eq!(names(&groups[0]), vec!["last.bin", "inner.bin", "top.bin"]);
    assert_eq!(summary.files_discovered, 4);
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.reclaimable_space, 14);
}

#[test]
fn test_multiple_groups_ordered_by_first_member() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a1", b"group two");
    write_file(dir.path(), "b1", b"group one");
    write_file(dir.path(), "c1", b"group two");
    write_file(dir.path(), "d1", b"group one");
    write_file(dir.path(), "e1", b"group one");

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(names(&groups[0]), vec!["a1", "c1"]);
    assert_eq!(names(&groups[1]), vec!["b1", "d1", "e1"]);
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "empty1", b"");
    write_file(dir.path(), "empty2", b"");

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].total_size(), 0);
}

#[test]
fn test_blake3_finds_same_groups() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "x", b"12345");
    write_file(dir.path(), "y", b"12345");
    write_file(dir.path(), "z", b"54321");

    let log = DiagnosticLog::new();
    let sha = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap()
        .0;
    let blake = DuplicateFinder::new(
        FinderConfig::default().with_digest_algorithm(DigestAlgorithm::Blake3),
    )
    .find_duplicates(dir.path(), &log)
    .unwrap()
    .0;

    assert_eq!(sha.len(), 1);
    assert_eq!(blake.len(), 1);
    assert_eq!(names(&sha[0]), names(&blake[0]));
    assert_ne!(sha[0].digest(), blake[0].digest());
}

#[test]
fn test_thread_count_does_not_change_results() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        write_file(dir.path(), &format!("f{i:02}"), format!("content {}", i % 7).as_bytes());
    }

    let log = DiagnosticLog::new();
    let single = DuplicateFinder::new(FinderConfig::default().with_io_threads(1))
        .find_duplicates(dir.path(), &log)
        .unwrap()
        .0;
    let many = DuplicateFinder::new(FinderConfig::default().with_io_threads(8))
        .find_duplicates(dir.path(), &log)
        .unwrap()
        .0;

    assert_eq!(single.len(), 7);
    assert_eq!(single, many);
}

#[test]
fn test_skip_hidden() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "visible", b"dup");
    write_file(dir.path(), ".hidden", b"dup");
    write_file(dir.path(), ".git/objects/blob", b"dup");

    let log = DiagnosticLog::new();
    let all = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap()
        .0;
    assert_eq!(all[0].len(), 3);

    let visible = DuplicateFinder::new(
        FinderConfig::default().with_walker_config(WalkerConfig::new(true)),
    )
    .find_duplicates(dir.path(), &log)
    .unwrap()
    .0;
    assert!(visible.is_empty());
}

#[test]
fn test_invalid_directory() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "plain.txt", b"x");

    for path in [file, dir.path().join("missing")] {
        let err = psamfinder::find_duplicates(&path, false, 0.8).unwrap_err();
        assert!(matches!(err, FinderError::InvalidDirectory(p) if p == path));
    }
}

#[test]
fn test_unreadable_file_does_not_hide_pair() {
    let dir = tempdir().unwrap();
    let mut files = Vec::new();
    for i in 0..8 {
        let path = write_file(dir.path(), &format!("unique{i}"), format!("u{i}").as_bytes());
        files.push(FileEntry::new(path, 2));
    }
    let a = write_file(dir.path(), "pair_a", b"twin");
    let b = write_file(dir.path(), "pair_b", b"twin");
    files.insert(3, FileEntry::new(a, 4));
    files.push(FileEntry::new(b, 4));
    files.insert(5, FileEntry::new(dir.path().join("vanished"), 4));

    let log = DiagnosticLog::new();
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_from_files(files, &log)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["pair_a", "pair_b"]);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(log.count(DiagnosticKind::Io), 1);
    assert!(log.snapshot()[0].path().unwrap().ends_with("vanished"));
}

#[cfg(unix)]
#[test]
fn test_symlinks_not_followed() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "real.txt", b"linked");
    std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();
    assert!(groups.is_empty());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_does_not_hide_pair() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_file(dir.path(), "pair_a", b"twin");
    write_file(dir.path(), "pair_b", b"twin");
    write_file(dir.path(), "locked/inside", b"twin");
    let locked = dir.path().join("locked");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to test then.
    if std::fs::read_dir(&locked).is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let log = DiagnosticLog::new();
    let result = DuplicateFinder::with_defaults().find_duplicates(dir.path(), &log);
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    let (groups, summary) = result.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["pair_a", "pair_b"]);
    assert_eq!(summary.walk_errors, 1);
    assert!(summary.has_skipped());
    assert_eq!(log.count(DiagnosticKind::Io), 1);
    assert!(log.snapshot()[0].path().unwrap().ends_with("locked"));
}
