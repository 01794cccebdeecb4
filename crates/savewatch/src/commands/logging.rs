//! Logging initialization.

use savewatch_core::config::LogLevel as ConfigLogLevel;
use savewatch_util::log::{self, LogConfig, LogLevel};

/// Initialize stderr logging.
///
/// `--verbose` wins over the configured level; `RUST_LOG` wins over both.
pub fn init_logging(verbose: bool, configured: Option<ConfigLogLevel>) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        configured.map(LogLevel::from).unwrap_or_default()
    };
    log::init(LogConfig {
        level,
        include_location: verbose,
    });
}
