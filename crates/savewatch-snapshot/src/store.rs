//! Snapshot storage implementation.

use crate::key::{logical_key, record_file_name};
use crate::retention::HistoryIndex;
use crate::{count_lines, PersistedSnapshot, Snapshot, SnapshotError, SnapshotResult};
use chrono::{DateTime, Utc};
use savewatch_storage::{FsStorage, Storage};
use savewatch_util::Identifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Configuration for snapshot storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum snapshots kept in memory per logical key.
    pub per_file_history_cap: usize,

    /// Maximum logical keys kept in memory at once.
    pub working_set_cap: usize,

    /// In-memory content longer than this (characters) is shrunk.
    pub memory_truncate_threshold: usize,

    /// Characters of content kept when shrinking in memory.
    pub memory_keep_chars: usize,

    /// Persisted content longer than this (characters) is cut to this length.
    pub disk_truncate_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            per_file_history_cap: 50,
            working_set_cap: 200,
            memory_truncate_threshold: 10_000,
            memory_keep_chars: 1_000,
            disk_truncate_threshold: 1_000,
        }
    }
}

/// Aggregate counts over the in-memory working set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_snapshots: usize,
    pub total_tracked_files: usize,
}

/// Result of [`SnapshotStore::record`].
///
/// The snapshot is always usable; `persisted` tells whether the disk copy
/// made it and where.
#[derive(Debug)]
pub struct Recorded {
    pub snapshot: Arc<Snapshot>,
    pub persisted: SnapshotResult<PathBuf>,
}

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Directories removed.
    pub removed: Vec<PathBuf>,
    /// Entries that could not be inspected or removed.
    pub failed: usize,
}

/// Storage for file snapshots.
///
/// Keeps a bounded per-file history in memory and writes every snapshot as a
/// JSON record:
/// ```text
/// root/
///   YYYY-MM-DD/
///     <session_id>/
///       <sanitized key>_<snapshot id>.json
/// ```
pub struct SnapshotStore {
    root: PathBuf,
    session_id: String,
    config: StoreConfig,
    storage: Arc<dyn Storage>,
    index: RwLock<HistoryIndex>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("root", &self.root)
            .field("session_id", &self.session_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Open a store rooted at `root` on the local filesystem.
    pub async fn open(root: impl Into<PathBuf>, config: StoreConfig) -> SnapshotResult<Self> {
        Self::with_storage(root, config, Arc::new(FsStorage::new())).await
    }

    /// Open a store on an arbitrary storage backend.
    ///
    /// Creates the root, today's directory and this session's directory.
    /// Any failure is an [`SnapshotError::Initialization`]; no store is
    /// returned, so nothing can be recorded against a half-initialized root.
    pub async fn with_storage(
        root: impl Into<PathBuf>,
        config: StoreConfig,
        storage: Arc<dyn Storage>,
    ) -> SnapshotResult<Self> {
        let root = root.into();
        let session_id = Identifier::session();

        let store = Self {
            index: RwLock::new(HistoryIndex::new(
                config.per_file_history_cap,
                config.working_set_cap,
            )),
            root,
            session_id,
            config,
            storage,
        };

        let now = Utc::now();
        for dir in [store.root.clone(), store.day_dir(now), store.session_dir(now)] {
            store
                .storage
                .create_dir_all(&dir)
                .await
                .map_err(|source| SnapshotError::Initialization {
                    path: dir.clone(),
                    source,
                })?;
        }

        info!(
            root = %store.root.display(),
            session_id = %store.session_id,
            "Snapshot store initialized"
        );
        Ok(store)
    }

    /// Compute the logical key of a file under the monitored root.
    pub fn logical_key(absolute_path: &Path, monitored_root: &Path) -> SnapshotResult<String> {
        logical_key(absolute_path, monitored_root)
    }

    /// Record a new snapshot of `content` under `logical_key`.
    ///
    /// The snapshot is in the in-memory history before the disk write starts.
    /// A failed write is reported in [`Recorded::persisted`]; only invalid
    /// arguments make this return `Err`.
    pub async fn record(
        &self,
        logical_key: &str,
        file_path: &Path,
        content: &str,
        language: &str,
    ) -> SnapshotResult<Recorded> {
        self.record_with_line_count(logical_key, file_path, content, count_lines(content), language)
            .await
    }

    /// Like [`SnapshotStore::record`], with the line count supplied by the
    /// document source instead of counted from `content`.
    pub async fn record_with_line_count(
        &self,
        logical_key: &str,
        file_path: &Path,
        content: &str,
        line_count: usize,
        language: &str,
    ) -> SnapshotResult<Recorded> {
        if logical_key.is_empty() {
            return Err(SnapshotError::invalid_input("logical key must not be empty"));
        }
        if file_path.as_os_str().is_empty() {
            return Err(SnapshotError::invalid_input("file path must not be empty"));
        }

        let mut snapshot = Snapshot::capture(
            self.session_id.as_str(),
            file_path,
            logical_key,
            content,
            language,
        );
        snapshot.line_count = line_count;

        // Disk form is cut from the full content, before any in-memory shrink.
        let persisted_form =
            PersistedSnapshot::from_full(&snapshot, self.config.disk_truncate_threshold);

        if snapshot.shrink_content(
            self.config.memory_truncate_threshold,
            self.config.memory_keep_chars,
        ) {
            debug!(
                key = logical_key,
                characters = snapshot.character_count,
                "Shrunk in-memory snapshot content"
            );
        }

        let snapshot = Arc::new(snapshot);
        let displaced = self.write_index().insert(Arc::clone(&snapshot));
        if let Some(dropped) = &displaced.dropped {
            debug!(key = logical_key, snapshot_id = %dropped, "Dropped oldest snapshot");
        }
        if let Some((evicted, count)) = &displaced.evicted {
            info!(
                key = %evicted,
                snapshots = count,
                "Evicted file history from memory"
            );
        }

        let persisted = self.persist(&persisted_form).await;
        if let Err(e) = &persisted {
            warn!(key = logical_key, snapshot_id = %snapshot.id, "{}", e);
        }

        Ok(Recorded {
            snapshot,
            persisted,
        })
    }

    async fn persist(&self, record: &PersistedSnapshot) -> SnapshotResult<PathBuf> {
        let snapshot = &record.snapshot;
        let dir = self.session_dir(snapshot.timestamp);
        let path = dir.join(record_file_name(&snapshot.relative_path, &snapshot.id));

        // Re-ensured on every write so a session running past midnight
        // lands in the new day's directory.
        self.storage
            .create_dir_all(&dir)
            .await
            .map_err(|e| SnapshotError::persistence(&path, e))?;

        let json =
            serde_json::to_vec_pretty(record).map_err(|e| SnapshotError::persistence(&path, e))?;
        self.storage
            .write(&path, &json)
            .await
            .map_err(|e| SnapshotError::persistence(&path, e))?;

        debug!(path = %path.display(), "Persisted snapshot");
        Ok(path)
    }

    /// In-memory history for `logical_key`, oldest first. Empty if unknown.
    pub fn history(&self, logical_key: &str) -> Vec<Arc<Snapshot>> {
        self.read_index().history(logical_key)
    }

    /// Most recently recorded snapshot for `logical_key`.
    pub fn previous(&self, logical_key: &str) -> Option<Arc<Snapshot>> {
        self.read_index().latest(logical_key)
    }

    pub fn stats(&self) -> StoreStats {
        let index = self.read_index();
        StoreStats {
            total_snapshots: index.snapshot_count(),
            total_tracked_files: index.key_count(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Delete dated directories under the root not modified in `max_age_days`.
    ///
    /// See [`purge_expired`]; today's directory, which holds the active
    /// session, is always kept.
    pub async fn purge_expired(&self, max_age_days: u32) -> PurgeReport {
        purge_expired(self.storage.as_ref(), &self.root, max_age_days).await
    }

    /// Read back a persisted snapshot record.
    pub async fn read_persisted(&self, path: &Path) -> SnapshotResult<PersistedSnapshot> {
        let bytes = self
            .storage
            .read(path)
            .await?
            .ok_or_else(|| SnapshotError::NotFound(path.to_path_buf()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Records written by this session today, sorted by file name.
    pub async fn persisted_records(&self) -> SnapshotResult<Vec<PathBuf>> {
        let dir = self.session_dir(Utc::now());
        let mut records: Vec<PathBuf> = self
            .storage
            .read_dir(&dir)
            .await?
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !e.is_dir && e.path.extension().is_some_and(|ext| ext == "json"))
            .map(|e| e.path)
            .collect();
        records.sort();
        Ok(records)
    }

    fn day_dir(&self, at: DateTime<Utc>) -> PathBuf {
        day_dir(&self.root, at)
    }

    fn session_dir(&self, at: DateTime<Utc>) -> PathBuf {
        self.day_dir(at).join(&self.session_id)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, HistoryIndex> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, HistoryIndex> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Delete immediate sub-directories of `root` not modified in `max_age_days`.
///
/// Never fails: a missing root is a no-op and per-entry failures are logged
/// and counted. Today's dated directory is never removed.
pub async fn purge_expired(storage: &dyn Storage, root: &Path, max_age_days: u32) -> PurgeReport {
    let _timing = savewatch_util::TimingGuard::purge(root.display().to_string());
    let mut report = PurgeReport::default();
    let max_age = Duration::from_secs(u64::from(max_age_days) * 24 * 60 * 60);
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match storage.read_dir(root).await {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            debug!(root = %root.display(), "No snapshot root, nothing to purge");
            return report;
        }
        Err(e) => {
            warn!(root = %root.display(), "Failed to list snapshot root: {}", e);
            report.failed += 1;
            return report;
        }
    };

    let active_day = day_dir(root, Utc::now());
    for entry in entries {
        if !entry.is_dir || entry.modified >= cutoff || entry.path == active_day {
            continue;
        }
        match storage.remove_dir_all(&entry.path).await {
            Ok(()) => {
                info!(dir = %entry.name(), "Removed expired snapshot directory");
                report.removed.push(entry.path);
            }
            Err(e) => {
                warn!(dir = %entry.path.display(), "Failed to remove expired snapshots: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

fn day_dir(root: &Path, at: DateTime<Utc>) -> PathBuf {
    root.join(at.format("%Y-%m-%d").to_string())
}
