use dupescan::checkpoint::CheckpointStore;
use dupescan::progress::{ProgressSink, ProgressSnapshot};
use dupescan::scan::{ScanConfig, Scanner};
use dupescan::scanner::ScanError;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn write_file(path: &Path, bytes: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![b'm'; bytes]).unwrap();
}

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
    finished: Mutex<Option<ProgressSnapshot>>,
}

impl ProgressSink for Recorder {
    fn on_directory_complete(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn on_scan_finished(&self, snapshot: &ProgressSnapshot) {
        *self.finished.lock().unwrap() = Some(snapshot.clone());
    }
}

#[test]
fn test_many_roots_share_one_index() {
    let dir = tempdir().unwrap();
    let roots: Vec<_> = (0..4).map(|i| dir.path().join(format!("root{i}"))).collect();
    for (i, root) in roots.iter().enumerate() {
        write_file(&root.join("shared.iso"), 4096);
        write_file(&root.join(format!("nested/unique{i}.txt")), 10);
        write_file(&root.join("nested/common.txt"), 10);
    }

    let report = Scanner::new(ScanConfig::default()).run(&roots).unwrap();

    assert_eq!(report.roots.len(), 4);
    let snapshot = report.snapshot();
    assert_eq!(snapshot.total_files, 12);
    assert_eq!(snapshot.duplicate_count, 6);
    assert_eq!(snapshot.bytes_wasted, 3 * 4096 + 3 * 10);
    assert_eq!(
        report.state.index.counters(),
        report.state.index.computed_counters()
    );
}

#[test]
fn test_overlapping_roots_are_not_double_counted() {
    let dir = tempdir().unwrap();
    let outer = dir.path().join("outer");
    let inner = outer.join("inner");
    write_file(&inner.join("a.txt"), 5);
    write_file(&outer.join("b.txt"), 5);

    let report = Scanner::new(ScanConfig::default())
        .run(&[inner.clone(), outer.clone(), outer])
        .unwrap();

    assert_eq!(report.roots.len(), 1);
    assert_eq!(report.snapshot().total_files, 2);
    assert_eq!(report.snapshot().duplicate_count, 0);
}

#[test]
fn test_one_invalid_root_fails_the_whole_scan() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good");
    write_file(&good.join("f"), 1);
    let store = CheckpointStore::new(dir.path().join("cp.json"));

    let err = Scanner::new(ScanConfig::default())
        .with_checkpoint_store(store.clone())
        .run(&[good, dir.path().join("missing")])
        .unwrap_err();

    assert!(matches!(err, ScanError::RootNotFound(_)));
    assert!(!store.path().exists());
}

#[test]
fn test_progress_snapshots_are_consistent() {
    let dir = tempdir().unwrap();
    let roots: Vec<_> = ["p", "q"].iter().map(|r| dir.path().join(r)).collect();
    for root in &roots {
        for sub in ["one", "two", "three"] {
            write_file(&root.join(sub).join("same.bin"), 64);
        }
    }

    let recorder = Arc::new(Recorder::default());
    let report = Scanner::new(ScanConfig::default())
        .with_progress(recorder.clone())
        .run(&roots)
        .unwrap();

    let snapshots = recorder.snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 6);
    for snapshot in snapshots.iter() {
        // Every file seen so far shares one key.
        assert_eq!(snapshot.duplicate_count, snapshot.total_files.saturating_sub(1));
        assert_eq!(snapshot.bytes_wasted, snapshot.duplicate_count * 64);
        assert!(snapshot.current_path.is_some());
    }

    let finished = recorder.finished.lock().unwrap().clone().unwrap();
    assert_eq!(finished, report.snapshot());
    assert_eq!(finished.total_files, 6);
}
