//! RAII-based timing for save handling and storage sweeps.
//!
//! # Example
//!
//! ```rust,ignore
//! use savewatch_util::timing::TimingGuard;
//!
//! async fn handle(key: &str) {
//!     let _timing = TimingGuard::save(key);
//!     // ... record + classify ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// RAII guard that logs how long an operation took once it is dropped.
pub struct TimingGuard {
    /// Kind of operation (e.g. "save", "purge", "scan").
    operation_type: &'static str,
    /// Subject of the operation, usually a logical file key.
    operation_name: String,
    start: Instant,
    /// At or above this, log at info instead of debug.
    info_threshold_ms: u64,
    /// At or above this, log at warn.
    warn_threshold_ms: u64,
}

impl TimingGuard {
    /// Start timing an operation.
    pub fn new(operation_type: &'static str, operation_name: impl Into<String>) -> Self {
        Self {
            operation_type,
            operation_name: operation_name.into(),
            start: Instant::now(),
            info_threshold_ms: 250,
            warn_threshold_ms: 2000,
        }
    }

    /// Time the handling of one save event.
    pub fn save(key: impl Into<String>) -> Self {
        Self::new("save", key)
    }

    /// Time an expiry sweep over persisted snapshot directories.
    pub fn purge(root: impl Into<String>) -> Self {
        Self::new("purge", root)
    }

    /// Set the threshold for info-level logging (in milliseconds).
    pub fn with_info_threshold(mut self, ms: u64) -> Self {
        self.info_threshold_ms = ms;
        self
    }

    /// Set the threshold for warn-level logging (in milliseconds).
    pub fn with_warn_threshold(mut self, ms: u64) -> Self {
        self.warn_threshold_ms = ms;
        self
    }

    /// Get the elapsed time so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        let pretty = format_duration(elapsed);

        if elapsed_ms >= self.warn_threshold_ms {
            warn!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = elapsed_ms,
                duration = %pretty,
                "Slow operation completed"
            );
        } else if elapsed_ms >= self.info_threshold_ms {
            info!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = elapsed_ms,
                duration = %pretty,
                "Operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = elapsed_ms,
                "Operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timing_guard_measures() {
        let guard = TimingGuard::save("src/main.rs");
        sleep(Duration::from_millis(5));
        assert!(guard.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_timing_guard_thresholds_drop_cleanly() {
        let guard = TimingGuard::purge("/tmp/snapshots")
            .with_info_threshold(0)
            .with_warn_threshold(1);
        sleep(Duration::from_millis(2));
        drop(guard);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
