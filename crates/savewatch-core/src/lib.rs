//! Core logic for savewatch.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - Suspicious-change classification
//! - The [`Tracker`] that turns save events into snapshots and findings
//! - Finding sinks
//! - The AI extension scanner

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod scanner;
pub mod sink;
pub mod tracker;

pub use classify::{classify, ChangeDeltas, Finding, FindingCategory, Severity, Thresholds};
pub use config::Config;
pub use document::{Document, FileDocument};
pub use error::{ConfigError, CoreError, CoreResult};
pub use scanner::{ExtensionScanner, ScanReport, ScanTask};
pub use sink::{ChannelSink, FindingSink, LogSink};
pub use tracker::{InertReason, SaveOutcome, SaveReport, Tracker};
