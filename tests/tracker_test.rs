//! Artifact tracker tests against real temporary directories.

use std::fs;

use drainq::tracker::ArtifactTracker;
use tempfile::tempdir;

#[test]
fn snapshot_lists_only_regular_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();
    fs::create_dir(dir.path().join("subdir")).unwrap();

    let tracker = ArtifactTracker::new(dir.path());
    let snap = tracker.snapshot();

    assert_eq!(snap.len(), 2);
    assert!(snap.contains("a.txt"));
    assert!(snap.contains("b.txt"));
    assert!(!snap.contains("subdir"));
}

#[test]
fn snapshot_of_missing_directory_is_empty() {
    let tracker = ArtifactTracker::new("/nonexistent/drainq-test-dir");
    assert!(tracker.snapshot().is_empty());
}

#[test]
fn diff_reports_new_files_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("before.txt"), "x").unwrap();

    let tracker = ArtifactTracker::new(dir.path());
    let baseline = tracker.snapshot();

    fs::write(dir.path().join("after.txt"), "y").unwrap();

    assert_eq!(tracker.diff(&baseline), vec!["after.txt".to_string()]);
}

#[test]
fn cleanup_restores_baseline_exactly() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "k").unwrap();

    let tracker = ArtifactTracker::new(dir.path());
    let baseline = tracker.snapshot();

    fs::write(dir.path().join("stray1.txt"), "s").unwrap();
    fs::write(dir.path().join("stray2.txt"), "s").unwrap();

    tracker.cleanup(&baseline);

    assert!(dir.path().join("keep.txt").exists());
    assert!(!dir.path().join("stray1.txt").exists());
    assert!(!dir.path().join("stray2.txt").exists());
    assert_eq!(tracker.snapshot(), baseline);
}

#[cfg(unix)]
#[test]
fn cleanup_is_best_effort_when_files_cannot_be_deleted() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "k").unwrap();

    let tracker = ArtifactTracker::new(dir.path());
    let baseline = tracker.snapshot();

    fs::write(dir.path().join("stuck1.txt"), "s").unwrap();
    fs::write(dir.path().join("stuck2.txt"), "s").unwrap();

    // Without write permission on the directory, unlink fails per file.
    // Cleanup must walk every candidate and swallow each failure (privileged
    // users bypass the permission check, so the unlinks may still land —
    // either way nothing panics and the baseline file survives).
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
    tracker.cleanup(&baseline);
    assert!(tracker.dir().join("keep.txt").exists());

    // Once deletable, a later sweep restores the baseline.
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
    tracker.cleanup(&baseline);
    assert!(!dir.path().join("stuck1.txt").exists());
    assert!(!dir.path().join("stuck2.txt").exists());
    assert_eq!(tracker.snapshot(), baseline);
}

#[test]
fn cleanup_with_no_new_files_is_a_noop() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "k").unwrap();

    let tracker = ArtifactTracker::new(dir.path());
    let baseline = tracker.snapshot();

    tracker.cleanup(&baseline);
    assert!(dir.path().join("keep.txt").exists());
}
