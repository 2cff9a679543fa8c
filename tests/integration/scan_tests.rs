use dupescan::checkpoint::CheckpointStore;
use dupescan::duplicates::FileKey;
use dupescan::scan::{ScanConfig, Scanner};
use dupescan::scanner::ScanError;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, bytes: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path)
        .unwrap()
        .write_all(&vec![b'z'; bytes])
        .unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(report.is_complete());
    assert!(report.state.index.is_empty());
    assert_eq!(report.snapshot().total_files, 0);
}

#[test]
fn test_same_name_and_size_in_two_roots() {
    let dir = tempdir().unwrap();
    let r1 = dir.path().join("r1");
    let r2 = dir.path().join("r2");
    write_file(&r1.join("dup.bin"), 500);
    write_file(&r2.join("dup.bin"), 500);

    let report = Scanner::new(ScanConfig::default())
        .run(&[r1.clone(), r2.clone()])
        .unwrap();

    let snapshot = report.snapshot();
    assert_eq!(snapshot.total_files, 2);
    assert_eq!(snapshot.duplicate_count, 1);
    assert_eq!(snapshot.bytes_wasted, 500);

    let locations = report
        .state
        .index
        .locations(&FileKey::new("dup.bin", 500))
        .unwrap();
    assert_eq!(locations.len(), 2);
}

#[test]
fn test_content_is_not_compared() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/notes.txt"), "hello").unwrap();
    fs::write(dir.path().join("b/notes.txt"), "world").unwrap();

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.snapshot().duplicate_count, 1);
}

#[test]
fn test_same_name_different_size_is_not_duplicate() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a/report.pdf"), 10);
    write_file(&dir.path().join("b/report.pdf"), 11);
    write_file(&dir.path().join("c/other.pdf"), 10);

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let snapshot = report.snapshot();
    assert_eq!(snapshot.total_files, 3);
    assert_eq!(snapshot.duplicate_count, 0);
    assert_eq!(report.state.index.group_count(), 3);
}

#[test]
fn test_three_copies_waste_two() {
    let dir = tempdir().unwrap();
    for sub in ["x", "y", "z"] {
        write_file(&dir.path().join(sub).join("photo.jpg"), 1000);
    }

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let snapshot = report.snapshot();
    assert_eq!(snapshot.duplicate_count, 2);
    assert_eq!(snapshot.bytes_wasted, 2000);
    assert_eq!(report.state.index.duplicate_groups().count(), 1);
}

#[test]
fn test_zero_byte_duplicates_waste_nothing() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a/.keep"), 0);
    write_file(&dir.path().join("b/.keep"), 0);

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.snapshot().duplicate_count, 1);
    assert_eq!(report.snapshot().bytes_wasted, 0);
}

#[test]
fn test_names_with_colons_survive_checkpoint() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    write_file(&data.join("a/12:30:00.log"), 7);
    write_file(&data.join("b/12:30:00.log"), 7);
    let store = CheckpointStore::new(dir.path().join("cp.json"));

    let report = Scanner::new(ScanConfig::default())
        .with_checkpoint_store(store.clone())
        .run(&[data])
        .unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.index, report.state.index);
    assert!(loaded
        .index
        .locations(&FileKey::new("12:30:00.log", 7))
        .is_some());
}

#[test]
fn test_marker_is_last_completed_directory() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a/f"), 1);
    write_file(&dir.path().join("b/c/f"), 1);

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let root = dir.path().canonicalize().unwrap();
    assert_eq!(report.state.marker, Some(root.join("b")));
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("cp.json"));

    let err = Scanner::new(ScanConfig::default())
        .with_checkpoint_store(store.clone())
        .run(&[dir.path().join("nope")])
        .unwrap_err();

    assert!(matches!(err, ScanError::RootNotFound(_)));
    assert!(!store.path().exists());
}

#[test]
fn test_file_root_is_fatal() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();

    let err = Scanner::new(ScanConfig::default())
        .run(&[file])
        .unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory(_)));
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_file(&dir.path().join("open/a.txt"), 3);
    write_file(&dir.path().join("locked/a.txt"), 3);
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to assert in that case.
    let readable_anyway = fs::read_dir(&locked).is_ok();

    let report = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(report.is_complete());
    if !readable_anyway {
        assert_eq!(report.snapshot().total_files, 1);
    }
}
