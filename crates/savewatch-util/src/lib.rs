//! Shared utilities for savewatch.
//!
//! This crate provides common utilities used across the savewatch workspace:
//! - ULID-based identifier generation
//! - Logging setup with tracing
//! - Path utilities
//! - RAII-based timing for operation measurement

pub mod id;
pub mod log;
pub mod path;
pub mod timing;

pub use id::Identifier;
pub use timing::TimingGuard;
