use std::fs;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use psamfinder::actions::{
    execute_deletion, plan_deletion, select_by_policy, DeleteOptions, DeletionStatus,
    DeletionSummary, GroupState, KeepPolicy, KeepSelection,
};
use psamfinder::diagnostics::{DiagnosticKind, DiagnosticLog};
use psamfinder::duplicates::DuplicateFinder;
use tempfile::tempdir;

use super::support::{list_files, write_file};

fn triple(dir: &std::path::Path) {
    write_file(dir, "a.dat", b"same bytes");
    write_file(dir, "b.dat", b"same bytes");
    write_file(dir, "c.dat", b"same bytes");
    write_file(dir, "other.dat", b"different");
}

#[test]
fn test_keep_each_index_leaves_only_that_file() {
    for (index, expected) in [(1, "a.dat"), (2, "b.dat"), (3, "c.dat")] {
        let dir = tempdir().unwrap();
        triple(dir.path());

        let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();
        let plans = psamfinder::plan_deletion(&groups, &[KeepSelection::Keep(index)]);
        assert_eq!(plans[0].state(), GroupState::KeepSelected);

        let outcomes = psamfinder::execute_deletion(plans, false);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == DeletionStatus::Removed));

        assert_eq!(list_files(dir.path()), vec![expected, "other.dat"]);
    }
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempdir().unwrap();
    triple(dir.path());
    let before = list_files(dir.path());

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();
    let plans = psamfinder::plan_deletion(&groups, &[KeepSelection::Keep(1)]);
    let outcomes = psamfinder::execute_deletion(plans, true);

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|o| o.status == DeletionStatus::WouldRemove));
    let summary = DeletionSummary::from_outcomes(&outcomes);
    assert_eq!(summary.would_remove, 2);
    assert_eq!(summary.bytes, 20);
    assert_eq!(list_files(dir.path()), before);
}

#[test]
fn test_skip_and_invalid_selections_touch_nothing() {
    let dir = tempdir().unwrap();
    triple(dir.path());
    write_file(dir.path(), "x1.dat", b"second group");
    write_file(dir.path(), "x2.dat", b"second group");
    let before = list_files(dir.path());

    let log = DiagnosticLog::new();
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();
    assert_eq!(groups.len(), 2);

    for selection in [
        KeepSelection::Keep(0),
        KeepSelection::Keep(4),
        KeepSelection::parse("first"),
        KeepSelection::parse("skip"),
    ] {
        let log = DiagnosticLog::new();
        let plans = plan_deletion(&groups, &[selection.clone()], &log);
        assert!(plans.iter().all(|p| p.state() == GroupState::Skipped));

        let outcomes = execute_deletion(plans, &DeleteOptions::default(), &log);
        assert!(outcomes.is_empty());

        let expected = usize::from(selection != KeepSelection::Skip);
        assert_eq!(log.count(DiagnosticKind::InvalidSelection), expected);
        assert_eq!(list_files(dir.path()), before);
    }
}

#[test]
fn test_one_group_failure_does_not_stop_others() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "g1_a", b"one");
    write_file(dir.path(), "g1_b", b"one");
    write_file(dir.path(), "g2_a", b"two");
    write_file(dir.path(), "g2_b", b"two");

    let log = DiagnosticLog::new();
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();
    let plans = plan_deletion(
        &groups,
        &[KeepSelection::Keep(1), KeepSelection::Keep(1)],
        &log,
    );

    // Removed externally between scan and execution.
    fs::remove_file(dir.path().join("g1_b")).unwrap();

    let outcomes = execute_deletion(plans, &DeleteOptions::default(), &log);
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0].status, DeletionStatus::Failed(_)));
    assert_eq!(outcomes[1].status, DeletionStatus::Removed);
    assert_eq!(log.count(DiagnosticKind::DeletionFailure), 1);
    assert_eq!(list_files(dir.path()), vec!["g1_a", "g2_a"]);
}

#[test]
fn test_missing_kept_file_protects_group() {
    let dir = tempdir().unwrap();
    triple(dir.path());

    let log = DiagnosticLog::new();
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();
    let plans = plan_deletion(&groups, &[KeepSelection::Keep(2)], &log);

    fs::remove_file(dir.path().join("b.dat")).unwrap();

    for options in [DeleteOptions::dry_run(), DeleteOptions::default()] {
        let outcomes = execute_deletion(plans.clone(), &options, &log);
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            match &outcome.status {
                DeletionStatus::Failed(reason) => assert!(reason.contains("b.dat")),
                other => panic!("expected failure, got {other:?}"),
            }
        }
    }
    assert_eq!(list_files(dir.path()), vec!["a.dat", "c.dat", "other.dat"]);
}

#[test]
fn test_newest_policy_keeps_most_recent() {
    let dir = tempdir().unwrap();
    triple(dir.path());

    let base = SystemTime::now() - Duration::from_secs(3600);
    for (name, offset) in [("a.dat", 0), ("b.dat", 600), ("c.dat", 300)] {
        let mtime = FileTime::from_system_time(base + Duration::from_secs(offset));
        set_file_mtime(dir.path().join(name), mtime).unwrap();
    }

    let log = DiagnosticLog::new();
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), &log)
        .unwrap();

    let selections = select_by_policy(&groups, KeepPolicy::Newest);
    assert_eq!(selections, vec![KeepSelection::Keep(2)]);

    let plans = plan_deletion(&groups, &selections, &log);
    let outcomes = execute_deletion(plans, &DeleteOptions::default(), &log);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(list_files(dir.path()), vec!["b.dat", "other.dat"]);

    assert!(log.is_empty());
}

#[test]
fn test_oldest_policy_keeps_least_recent() {
    let dir = tempdir().unwrap();
    triple(dir.path());

    let base = SystemTime::now() - Duration::from_secs(3600);
    for (name, offset) in [("a.dat", 500), ("b.dat", 600), ("c.dat", 100)] {
        let mtime = FileTime::from_system_time(base + Duration::from_secs(offset));
        set_file_mtime(dir.path().join(name), mtime).unwrap();
    }

    let groups = psamfinder::find_duplicates(dir.path(), false, 0.8).unwrap();
    let selections = select_by_policy(&groups, KeepPolicy::Oldest);
    assert_eq!(selections, vec![KeepSelection::Keep(3)]);
}
