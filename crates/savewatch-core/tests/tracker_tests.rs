//! Tracker integration tests.
//!
//! These run the full save pipeline against the local filesystem.

use savewatch_core::{
    ChannelSink, Config, FileDocument, FindingCategory, SaveOutcome, SaveReport, Tracker,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    project: std::path::PathBuf,
    storage: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = temp.path().join("project");
    let storage = temp.path().join("snapshots");
    fs::create_dir_all(project.join("src")).expect("Failed to create project");
    Fixture {
        _temp: temp,
        project,
        storage,
    }
}

fn config(f: &Fixture) -> Config {
    Config {
        monitored_folder: Some(f.project.clone()),
        storage_dir: Some(f.storage.clone()),
        ..Default::default()
    }
}

async fn save(tracker: &Tracker, path: &Path, text: &str) -> SaveReport {
    fs::write(path, text).expect("Failed to write file");
    let doc = FileDocument::load(path).await.expect("Failed to load document");
    match tracker.handle_save(&doc).await.expect("Save failed") {
        SaveOutcome::Recorded(report) => report,
        other => panic!("expected a recorded save, got {other:?}"),
    }
}

#[tokio::test]
async fn test_persisted_record_matches_snapshot() {
    let f = fixture();
    let (sink, _rx) = ChannelSink::new();
    let tracker = Tracker::new(config(&f), Arc::new(sink)).await.unwrap();

    let path = f.project.join("src").join("main.rs");
    let report = save(&tracker, &path, "fn main() {\n    println!(\"hi\");\n}\n").await;

    let record_path = report.persisted.clone().expect("record not written");
    assert!(record_path.starts_with(&f.storage));
    assert_eq!(
        record_path.parent().and_then(|p| p.file_name()),
        Some(std::ffi::OsStr::new(tracker.store().session_id()))
    );

    let persisted = tracker.store().read_persisted(&record_path).await.unwrap();
    assert!(!persisted.content_truncated);
    assert_eq!(persisted.snapshot, *report.snapshot);
    assert_eq!(persisted.snapshot.relative_path, "src/main.rs");
    assert_eq!(persisted.snapshot.metadata.language, "rust");

    let records = tracker.store().persisted_records().await.unwrap();
    assert_eq!(records, vec![record_path]);
}

#[tokio::test]
async fn test_long_content_is_truncated_on_disk_only() {
    let f = fixture();
    let (sink, _rx) = ChannelSink::new();
    let tracker = Tracker::new(config(&f), Arc::new(sink)).await.unwrap();

    let text = "y".repeat(5_000);
    let report = save(&tracker, &f.project.join("blob.txt"), &text).await;
    assert_eq!(report.snapshot.content, text);

    let persisted = tracker
        .store()
        .read_persisted(report.persisted.as_deref().unwrap())
        .await
        .unwrap();
    assert!(persisted.content_truncated);
    assert!(persisted.snapshot.content.ends_with("...[truncated]"));
    assert_eq!(persisted.snapshot.character_count, 5_000);
    assert_eq!(persisted.snapshot.hash, report.snapshot.hash);
}

#[tokio::test]
async fn test_content_replacement_is_reported() {
    let f = fixture();
    let (sink, mut rx) = ChannelSink::new();
    let tracker = Tracker::new(
        Config {
            // only the character rule can fire
            line_threshold: Some(10_000),
            ..config(&f)
        },
        Arc::new(sink),
    )
    .await
    .unwrap();

    let path = f.project.join("src").join("lib.rs");
    save(&tracker, &path, "pub fn a() {}\n").await;
    let report = save(&tracker, &path, &"// pasted\n".repeat(100)).await;

    let finding = report.finding.expect("expected a finding");
    assert_eq!(finding.category, FindingCategory::ContentReplacement);
    assert_eq!(finding.file_key, "src/lib.rs");
    assert_eq!(rx.recv().await, Some(finding));
}

#[tokio::test]
async fn test_startup_purges_expired_directories() {
    let f = fixture();
    let old = f.storage.join("2000-01-01");
    fs::create_dir_all(old.join("ses_old")).unwrap();
    fs::write(old.join("ses_old").join("a_snp_x.json"), "{}").unwrap();
    let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60);
    fs::File::open(&old)
        .and_then(|dir| dir.set_modified(ten_days_ago))
        .expect("Failed to age directory");

    let (sink, _rx) = ChannelSink::new();
    let tracker = Tracker::new(config(&f), Arc::new(sink)).await.unwrap();

    assert!(!old.exists());
    assert!(tracker.store().root().is_dir());
}

#[tokio::test]
async fn test_unwritable_storage_root_fails_startup() {
    let f = fixture();
    // a regular file where the storage root should be
    fs::write(&f.storage, "not a directory").unwrap();

    let (sink, _rx) = ChannelSink::new();
    let result = Tracker::new(config(&f), Arc::new(sink)).await;
    assert!(result.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_root_keeps_relative_keys() {
    let f = fixture();
    fs::create_dir_all(f.project.join("tests")).unwrap();
    let link = f.project.with_file_name("project-link");
    std::os::unix::fs::symlink(&f.project, &link).unwrap();

    let config = Config {
        monitored_folder: Some(link),
        ..config(&f)
    };
    let (sink, _rx) = ChannelSink::new();
    let tracker = Tracker::new(config, Arc::new(sink)).await.unwrap();

    let a = save(&tracker, &f.project.join("src").join("mod.rs"), "pub mod a;\n").await;
    let b = save(&tracker, &f.project.join("tests").join("mod.rs"), "mod b;\n").await;

    assert_eq!(a.key, "src/mod.rs");
    assert_eq!(b.key, "tests/mod.rs");
    assert!(b.is_first());
    assert_eq!(tracker.history("src/mod.rs").len(), 1);
}
