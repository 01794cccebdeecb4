//! Bounded in-memory snapshot history.
//!
//! Two independent bounds apply:
//! - each logical key keeps at most `per_file_cap` snapshots (FIFO);
//! - at most `working_set_cap` keys are held at once. An insertion that
//!   pushes the set over the bound evicts exactly one other key: the one with
//!   the fewest snapshots, ties going to the least recently recorded key.
//!
//! Eviction only forgets the in-memory history; persisted records stay.

use crate::{Snapshot, SnapshotId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug)]
struct FileHistory {
    snapshots: VecDeque<Arc<Snapshot>>,
    /// Insertion sequence number of the latest snapshot.
    last_recorded: u64,
}

/// What an insertion displaced.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Displaced {
    /// Oldest snapshot dropped from the key's own history.
    pub dropped: Option<SnapshotId>,
    /// Key evicted from the working set, with how many snapshots it held.
    pub evicted: Option<(String, usize)>,
}

#[derive(Debug)]
pub(crate) struct HistoryIndex {
    files: HashMap<String, FileHistory>,
    per_file_cap: usize,
    working_set_cap: usize,
    sequence: u64,
}

impl HistoryIndex {
    pub fn new(per_file_cap: usize, working_set_cap: usize) -> Self {
        Self {
            files: HashMap::new(),
            per_file_cap: per_file_cap.max(1),
            working_set_cap: working_set_cap.max(1),
            sequence: 0,
        }
    }

    /// Append a snapshot to the history of `snapshot.relative_path`.
    pub fn insert(&mut self, snapshot: Arc<Snapshot>) -> Displaced {
        self.sequence += 1;
        let key = snapshot.relative_path.clone();
        let mut displaced = Displaced::default();

        let history = self.files.entry(key.clone()).or_insert_with(|| FileHistory {
            snapshots: VecDeque::new(),
            last_recorded: 0,
        });
        history.snapshots.push_back(snapshot);
        history.last_recorded = self.sequence;
        while history.snapshots.len() > self.per_file_cap {
            displaced.dropped = history.snapshots.pop_front().map(|s| s.id.clone());
        }

        if self.files.len() > self.working_set_cap {
            displaced.evicted = self.evict_one(&key);
        }

        displaced
    }

    /// Evict the key with the fewest snapshots, never `keep`.
    fn evict_one(&mut self, keep: &str) -> Option<(String, usize)> {
        let victim = self
            .files
            .iter()
            .filter(|(key, _)| key.as_str() != keep)
            .min_by_key(|(_, h)| (h.snapshots.len(), h.last_recorded))
            .map(|(key, _)| key.clone())?;
        self.files
            .remove(&victim)
            .map(|h| (victim, h.snapshots.len()))
    }

    pub fn history(&self, key: &str) -> Vec<Arc<Snapshot>> {
        self.files
            .get(key)
            .map(|h| h.snapshots.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, key: &str) -> Option<Arc<Snapshot>> {
        self.files.get(key).and_then(|h| h.snapshots.back().cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.files.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.files.values().map(|h| h.snapshots.len()).sum()
    }
}
