//! Destinations for suspicious-change findings.
//!
//! The tracker only produces findings; presenting them is up to the sink.

use crate::classify::Finding;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives findings as they are produced.
#[async_trait]
pub trait FindingSink: Send + Sync {
    async fn emit(&self, finding: Finding);
}

/// Forwards findings into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Finding>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Finding>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FindingSink for ChannelSink {
    async fn emit(&self, finding: Finding) {
        if let Err(e) = self.tx.send(finding) {
            warn!(file = %e.0.file_key, "Finding receiver dropped");
        }
    }
}

/// Logs each finding at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl FindingSink for LogSink {
    async fn emit(&self, finding: Finding) {
        warn!(
            file = %finding.file_key,
            category = %finding.category,
            severity = %finding.severity,
            line_delta = finding.line_delta,
            char_delta = finding.char_delta,
            elapsed_ms = finding.elapsed_ms,
            "Suspicious change detected"
        );
    }
}
