//! Suspicious-change classification.
//!
//! Compares two chronologically ordered snapshots of the same file and
//! decides whether the transition looks like a bulk paste. Rules run in a
//! fixed order and the first match wins:
//!
//! 1. **rapid-increase**: more than `line_threshold` lines added in less than
//!    `time_threshold_ms`.
//! 2. **content-replacement**: content hash changed and the character count
//!    moved by more than `char_threshold` in either direction.
//!
//! A negative elapsed time (clock skew, out-of-order events) never produces a
//! finding.

use savewatch_snapshot::{Snapshot, SnapshotId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Line growth strictly above this is "rapid" when fast enough.
    pub line_threshold: i64,
    /// Upper bound (exclusive) on elapsed time for a rapid increase.
    pub time_threshold_ms: i64,
    /// Absolute character change strictly above this counts as replacement.
    pub char_threshold: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            line_threshold: 50,
            time_threshold_ms: 30_000,
            char_threshold: 500,
        }
    }
}

/// Measured differences between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeDeltas {
    /// `current.timestamp - previous.timestamp` in milliseconds.
    pub elapsed_ms: i64,
    /// Signed line count change.
    pub line_delta: i64,
    /// Absolute character count change.
    pub char_delta: u64,
    /// Whether the content hashes differ.
    pub hash_changed: bool,
}

impl ChangeDeltas {
    pub fn between(previous: &Snapshot, current: &Snapshot) -> Self {
        Self {
            elapsed_ms: (current.timestamp - previous.timestamp).num_milliseconds(),
            line_delta: current.line_count as i64 - previous.line_count as i64,
            char_delta: (current.character_count as i64 - previous.character_count as i64)
                .unsigned_abs(),
            hash_changed: previous.hash != current.hash,
        }
    }

    /// Apply the rules to already measured deltas.
    pub fn classify(&self, thresholds: &Thresholds) -> Option<(FindingCategory, Severity)> {
        if self.elapsed_ms < 0 {
            return None;
        }
        if self.line_delta > thresholds.line_threshold
            && self.elapsed_ms < thresholds.time_threshold_ms
        {
            return Some((FindingCategory::RapidIncrease, Severity::High));
        }
        if self.hash_changed && self.char_delta > thresholds.char_threshold {
            return Some((FindingCategory::ContentReplacement, Severity::High));
        }
        None
    }
}

/// What kind of suspicious change was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    RapidIncrease,
    ContentReplacement,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::RapidIncrease => "rapid-increase",
            FindingCategory::ContentReplacement => "content-replacement",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspicious transition between two snapshots of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub file_key: String,
    pub category: FindingCategory,
    pub severity: Severity,
    pub line_delta: i64,
    pub char_delta: u64,
    pub elapsed_ms: i64,
    /// The snapshot that triggered the finding.
    pub snapshot_id: SnapshotId,
}

impl Finding {
    /// One-line human readable description.
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {}: {:+} lines, {} chars in {}ms",
            self.category,
            self.severity,
            self.file_key,
            self.line_delta,
            self.char_delta,
            self.elapsed_ms
        )
    }
}

/// Classify the transition from `previous` to `current`.
///
/// Pure and deterministic: the same inputs always give the same answer.
pub fn classify(previous: &Snapshot, current: &Snapshot, thresholds: &Thresholds) -> Option<Finding> {
    let deltas = ChangeDeltas::between(previous, current);
    let (category, severity) = deltas.classify(thresholds)?;
    Some(Finding {
        file_key: current.relative_path.clone(),
        category,
        severity,
        line_delta: deltas.line_delta,
        char_delta: deltas.char_delta,
        elapsed_ms: deltas.elapsed_ms,
        snapshot_id: current.id.clone(),
    })
}
