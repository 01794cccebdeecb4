//! Save tracking application state.
//!
//! A [`Tracker`] is built once at startup from a [`Config`]: it opens the
//! snapshot store, sweeps expired snapshot directories and is then ready to
//! handle save events. It is cheap to clone; all clones share one state.
//!
//! # Example
//!
//! ```ignore
//! use savewatch_core::{Config, FileDocument, LogSink, Tracker};
//! use std::sync::Arc;
//!
//! let (config, _) = Config::load(Some(project)).await?;
//! let tracker = Tracker::new(config, Arc::new(LogSink)).await?;
//!
//! let doc = FileDocument::load(project.join("src/main.rs")).await?;
//! let outcome = tracker.handle_save(&doc).await?;
//!
//! tracker.dispose().await;
//! ```

use crate::classify::{classify, Finding, Thresholds};
use crate::config::Config;
use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use crate::scanner::{ExtensionScanner, ScanReport, ScanTask};
use crate::sink::FindingSink;
use savewatch_snapshot::{Snapshot, SnapshotStore, StoreStats};
use savewatch_storage::{FsStorage, Storage};
use savewatch_util::path::resolve;
use savewatch_util::TimingGuard;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a save event was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertReason {
    NoMonitoredFolder,
    OutsideMonitoredFolder,
}

/// What handling one save event did.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Nothing was recorded.
    Inert(InertReason),
    /// Another save of the same file was still being handled.
    Dropped { key: String },
    Recorded(SaveReport),
}

impl SaveOutcome {
    pub fn finding(&self) -> Option<&Finding> {
        match self {
            SaveOutcome::Recorded(report) => report.finding.as_ref(),
            _ => None,
        }
    }
}

/// Details of a recorded save.
#[derive(Debug)]
pub struct SaveReport {
    pub key: String,
    pub snapshot: Arc<Snapshot>,
    /// Snapshot the new one was compared against.
    pub previous: Option<Arc<Snapshot>>,
    pub finding: Option<Finding>,
    /// Where the record was written, if it was.
    pub persisted: Option<PathBuf>,
    /// Why the record could not be written. The snapshot is kept in memory.
    pub persist_warning: Option<String>,
}

impl SaveReport {
    /// Whether this was the first snapshot of the file in memory.
    pub fn is_first(&self) -> bool {
        self.previous.is_none()
    }
}

/// Tracks saves inside one monitored folder.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: Config,
    thresholds: Thresholds,
    monitored_root: Option<PathBuf>,
    store: SnapshotStore,
    sink: Arc<dyn FindingSink>,
    /// Keys with a save currently being handled, and since when.
    in_flight: Mutex<HashMap<String, Instant>>,
    scan_task: Mutex<Option<ScanTask>>,
    disposed: AtomicBool,
}

/// Releases a key's in-flight slot when dropped.
struct InFlightSlot<'a> {
    slots: &'a Mutex<HashMap<String, Instant>>,
    key: String,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        lock(self.slots).remove(&self.key);
    }
}

impl Tracker {
    /// Build a tracker persisting under the configured storage directory.
    pub async fn new(config: Config, sink: Arc<dyn FindingSink>) -> CoreResult<Self> {
        let root = config.storage_dir()?;
        Self::with_storage(config, sink, root, Arc::new(FsStorage::new())).await
    }

    /// Build a tracker on an arbitrary storage backend.
    ///
    /// Fails if the storage root cannot be initialized; no tracker exists
    /// in that case, so monitoring never starts half-initialized.
    pub async fn with_storage(
        config: Config,
        sink: Arc<dyn FindingSink>,
        storage_root: impl Into<PathBuf>,
        storage: Arc<dyn Storage>,
    ) -> CoreResult<Self> {
        for warning in config.validate() {
            warn!("Config: {}", warning);
        }

        let store = SnapshotStore::with_storage(storage_root, config.store_config(), storage).await?;

        let purge = store.purge_expired(config.retention_days()).await;
        if !purge.removed.is_empty() || purge.failed > 0 {
            info!(
                removed = purge.removed.len(),
                failed = purge.failed,
                "Purged expired snapshots"
            );
        }

        let monitored_root = config.monitored_folder().map(resolve);
        match &monitored_root {
            Some(root) => info!(root = %root.display(), "Monitoring folder"),
            None => info!("No monitored folder configured, save handling is inert"),
        }

        Ok(Self {
            inner: Arc::new(TrackerInner {
                thresholds: config.thresholds(),
                monitored_root,
                store,
                sink,
                in_flight: Mutex::new(HashMap::new()),
                scan_task: Mutex::new(None),
                disposed: AtomicBool::new(false),
                config,
            }),
        })
    }

    /// Handle one save event.
    ///
    /// Records a snapshot, compares it with the previous one and emits any
    /// finding to the sink. Saves of the same file are handled one at a
    /// time; a save arriving while its file is still in flight is dropped.
    /// A failed disk write is reported in the outcome, not as an error.
    pub async fn handle_save(&self, document: &dyn Document) -> CoreResult<SaveOutcome> {
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }

        let Some(root) = self.inner.monitored_root.as_deref() else {
            debug!(path = %document.path().display(), "No monitored folder, ignoring save");
            return Ok(SaveOutcome::Inert(InertReason::NoMonitoredFolder));
        };
        // compared in the same resolved form as the monitored root
        let path = resolve(document.path());
        if !path.starts_with(root) {
            debug!(path = %path.display(), "Save outside monitored folder");
            return Ok(SaveOutcome::Inert(InertReason::OutsideMonitoredFolder));
        }

        let key = SnapshotStore::logical_key(&path, root)?;
        let Some(_slot) = self.try_claim(&key) else {
            return Ok(SaveOutcome::Dropped { key });
        };
        let _timing = TimingGuard::save(key.as_str());

        let store = &self.inner.store;
        let previous = store.previous(&key);
        let recorded = store
            .record_with_line_count(
                &key,
                &path,
                document.text(),
                document.line_count(),
                document.language_id(),
            )
            .await?;

        let (persisted, persist_warning) = match recorded.persisted {
            Ok(path) => (Some(path), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let finding = match &previous {
            Some(previous) => {
                let finding = classify(previous, &recorded.snapshot, &self.inner.thresholds);
                debug!(
                    key = %key,
                    lines = recorded.snapshot.line_count,
                    suspicious = finding.is_some(),
                    "Compared with previous snapshot"
                );
                finding
            }
            None => {
                debug!(key = %key, "First snapshot for file");
                None
            }
        };

        if let Some(finding) = &finding {
            self.inner.sink.emit(finding.clone()).await;
        }

        Ok(SaveOutcome::Recorded(SaveReport {
            key,
            snapshot: recorded.snapshot,
            previous,
            finding,
            persisted,
            persist_warning,
        }))
    }

    fn try_claim(&self, key: &str) -> Option<InFlightSlot<'_>> {
        let mut slots = lock(&self.inner.in_flight);
        if let Some(since) = slots.get(key) {
            info!(
                key,
                in_flight_ms = since.elapsed().as_millis() as u64,
                "Save already in progress for file, dropping event"
            );
            return None;
        }
        slots.insert(key.to_string(), Instant::now());
        Some(InFlightSlot {
            slots: &self.inner.in_flight,
            key: key.to_string(),
        })
    }

    /// Number of saves currently being handled.
    pub fn saves_in_flight(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }

    /// Start the periodic extension scan.
    ///
    /// Returns `None` if no extensions directory is known or a scan is
    /// already running.
    pub fn start_extension_scan(&self) -> Option<mpsc::UnboundedReceiver<ScanReport>> {
        let dir = self.inner.config.extensions_dir()?;
        let mut task = lock(&self.inner.scan_task);
        if task.is_some() {
            warn!("Extension scan already running");
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *task = Some(ScanTask::spawn(
            ExtensionScanner::new(dir),
            self.inner.config.scan_interval(),
            tx,
        ));
        Some(rx)
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.store.stats()
    }

    pub fn history(&self, key: &str) -> Vec<Arc<Snapshot>> {
        self.inner.store.history(key)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn monitored_root(&self) -> Option<&Path> {
        self.inner.monitored_root.as_deref()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Stop background work and refuse further saves. Idempotent.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let task = lock(&self.inner.scan_task).take();
        if let Some(task) = task {
            task.dispose().await;
        }
        let stats = self.stats();
        info!(
            session_id = %self.inner.store.session_id(),
            snapshots = stats.total_snapshots,
            files = stats.total_tracked_files,
            "Tracker disposed"
        );
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("monitored_root", &self.inner.monitored_root)
            .field("store", &self.inner.store)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FindingCategory;
    use crate::document::FileDocument;
    use crate::sink::{ChannelSink, LogSink};
    use async_trait::async_trait;
    use savewatch_storage::{DirEntryInfo, MemoryStorage, StorageResult};
    use tokio::sync::Semaphore;

    const ROOT: &str = "/work/project";
    const STORAGE_ROOT: &str = "/data/snapshots";

    fn config() -> Config {
        Config {
            monitored_folder: Some(PathBuf::from(ROOT)),
            ..Default::default()
        }
    }

    fn doc(rel: &str, lines: usize) -> FileDocument {
        let text = (0..lines)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        FileDocument::new(Path::new(ROOT).join(rel), text)
    }

    async fn tracker_with(config: Config, sink: Arc<dyn FindingSink>) -> (Arc<MemoryStorage>, Tracker) {
        let storage = Arc::new(MemoryStorage::new());
        let tracker = Tracker::with_storage(config, sink, STORAGE_ROOT, storage.clone())
            .await
            .unwrap();
        (storage, tracker)
    }

    fn recorded(outcome: SaveOutcome) -> SaveReport {
        match outcome {
            SaveOutcome::Recorded(report) => report,
            other => panic!("expected a recorded save, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_save_has_no_finding() {
        let (_storage, tracker) = tracker_with(config(), Arc::new(LogSink)).await;
        let report = recorded(tracker.handle_save(&doc("src/a.rs", 10)).await.unwrap());

        assert_eq!(report.key, "src/a.rs");
        assert!(report.is_first());
        assert!(report.finding.is_none());
        assert!(report.persisted.is_some());
        assert!(report.persist_warning.is_none());
        assert_eq!(tracker.stats().total_snapshots, 1);
    }

    #[tokio::test]
    async fn test_rapid_increase_reaches_sink() {
        let (sink, mut rx) = ChannelSink::new();
        let (_storage, tracker) = tracker_with(config(), Arc::new(sink)).await;

        tracker.handle_save(&doc("src/a.rs", 100)).await.unwrap();
        let outcome = tracker.handle_save(&doc("src/a.rs", 161)).await.unwrap();

        let finding = outcome.finding().cloned().unwrap();
        assert_eq!(finding.category, FindingCategory::RapidIncrease);
        assert_eq!(finding.line_delta, 61);
        assert_eq!(rx.recv().await, Some(finding));
    }

    #[tokio::test]
    async fn test_small_edit_is_quiet() {
        let (sink, mut rx) = ChannelSink::new();
        let (_storage, tracker) = tracker_with(config(), Arc::new(sink)).await;

        tracker.handle_save(&doc("a.txt", 100)).await.unwrap();
        let report = recorded(tracker.handle_save(&doc("a.txt", 105)).await.unwrap());
        assert!(!report.is_first());
        assert!(report.finding.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_inert_without_monitored_folder() {
        let (storage, tracker) = tracker_with(Config::default(), Arc::new(LogSink)).await;
        let outcome = tracker.handle_save(&doc("a.rs", 3)).await.unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Inert(InertReason::NoMonitoredFolder)
        ));
        assert_eq!(storage.file_count(), 0);
    }

    #[tokio::test]
    async fn test_inert_outside_monitored_folder() {
        let (_storage, tracker) = tracker_with(config(), Arc::new(LogSink)).await;
        let outside = FileDocument::new("/elsewhere/a.rs", "x");
        let outcome = tracker.handle_save(&outside).await.unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Inert(InertReason::OutsideMonitoredFolder)
        ));
        assert_eq!(tracker.stats().total_snapshots, 0);
    }

    #[tokio::test]
    async fn test_history_is_capped_per_file() {
        let (_storage, tracker) = tracker_with(config(), Arc::new(LogSink)).await;
        let mut ids = Vec::new();
        for i in 0..51 {
            let report = recorded(tracker.handle_save(&doc("big.rs", i + 1)).await.unwrap());
            ids.push(report.snapshot.id.clone());
        }

        let history = tracker.history("big.rs");
        assert_eq!(history.len(), 50);
        assert!(history.iter().all(|s| s.id != ids[0]));
        assert_eq!(history.last().unwrap().id, ids[50]);
    }

    #[tokio::test]
    async fn test_persist_failure_is_a_warning() {
        let (storage, tracker) = tracker_with(config(), Arc::new(LogSink)).await;
        storage.fail_writes_under(STORAGE_ROOT);

        let report = recorded(tracker.handle_save(&doc("a.rs", 3)).await.unwrap());
        assert!(report.persisted.is_none());
        assert!(report.persist_warning.is_some());
        assert_eq!(tracker.history("a.rs").len(), 1);

        // the next save still compares against the unpersisted snapshot
        let report = recorded(tracker.handle_save(&doc("a.rs", 4)).await.unwrap());
        assert!(!report.is_first());
    }

    #[tokio::test]
    async fn test_initialization_failure_propagates() {
        let storage = Arc::new(MemoryStorage::new());
        storage.fail_create_dir_under(STORAGE_ROOT);
        let result = Tracker::with_storage(config(), Arc::new(LogSink), STORAGE_ROOT, storage).await;
        assert!(matches!(result, Err(CoreError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_dispose_refuses_saves() {
        let (_storage, tracker) = tracker_with(config(), Arc::new(LogSink)).await;
        tracker.dispose().await;
        tracker.dispose().await;
        assert!(tracker.is_disposed());
        assert!(matches!(
            tracker.handle_save(&doc("a.rs", 1)).await,
            Err(CoreError::Disposed)
        ));
    }

    /// A document source that reports its own line count.
    struct CountedDocument {
        inner: FileDocument,
        lines: usize,
    }

    impl Document for CountedDocument {
        fn path(&self) -> &Path {
            self.inner.path()
        }

        fn text(&self) -> &str {
            self.inner.text()
        }

        fn line_count(&self) -> usize {
            self.lines
        }

        fn language_id(&self) -> &str {
            self.inner.language_id()
        }
    }

    #[tokio::test]
    async fn test_document_line_count_drives_classification() {
        let (sink, mut rx) = ChannelSink::new();
        let (_storage, tracker) = tracker_with(config(), Arc::new(sink)).await;

        let first = CountedDocument {
            inner: doc("src/a.rs", 3),
            lines: 100,
        };
        let report = recorded(tracker.handle_save(&first).await.unwrap());
        assert_eq!(report.snapshot.line_count, 100);

        // the text barely changes, the reported count jumps
        let second = CountedDocument {
            inner: doc("src/a.rs", 4),
            lines: 161,
        };
        let outcome = tracker.handle_save(&second).await.unwrap();
        let finding = outcome.finding().cloned().unwrap();
        assert_eq!(finding.category, FindingCategory::RapidIncrease);
        assert_eq!(finding.line_delta, 61);
        assert_eq!(rx.recv().await, Some(finding));
    }

    /// Storage whose file writes wait for a permit.
    struct GatedStorage {
        inner: MemoryStorage,
        gate: Semaphore,
    }

    #[async_trait]
    impl Storage for GatedStorage {
        async fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
            self.inner.create_dir_all(path).await
        }

        async fn write(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.inner.write(path, contents).await
        }

        async fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
            self.inner.read(path).await
        }

        async fn read_dir(&self, path: &Path) -> StorageResult<Option<Vec<DirEntryInfo>>> {
            self.inner.read_dir(path).await
        }

        async fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
            self.inner.remove_dir_all(path).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_save_of_same_file_is_dropped() {
        let storage = Arc::new(GatedStorage {
            inner: MemoryStorage::new(),
            gate: Semaphore::new(0),
        });
        let tracker = Tracker::with_storage(config(), Arc::new(LogSink), STORAGE_ROOT, storage.clone())
            .await
            .unwrap();

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.handle_save(&doc("a.rs", 5)).await }
        });
        while tracker.saves_in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let outcome = tracker.handle_save(&doc("a.rs", 6)).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Dropped { ref key } if key == "a.rs"));

        storage.gate.add_permits(2);
        let report = recorded(first.await.unwrap().unwrap());
        assert!(report.is_first());
        assert_eq!(tracker.saves_in_flight(), 0);

        // a different file is never blocked by another file's save
        let report = recorded(tracker.handle_save(&doc("b.rs", 1)).await.unwrap());
        assert!(report.is_first());
        assert_eq!(tracker.history("a.rs").len(), 1);
    }

    #[tokio::test]
    async fn test_extension_scan_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("codeium.codeium-1.0.0"))
            .await
            .unwrap();
        let config = Config {
            extensions_dir: Some(dir.path().to_path_buf()),
            ..config()
        };
        let (_storage, tracker) = tracker_with(config, Arc::new(LogSink)).await;

        let mut rx = tracker.start_extension_scan().unwrap();
        assert!(tracker.start_extension_scan().is_none());
        let report = rx.recv().await.unwrap();
        assert_eq!(report.detected, vec!["codeium.codeium"]);

        tracker.dispose().await;
        assert!(rx.recv().await.is_none());
    }
}
