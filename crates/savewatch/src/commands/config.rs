//! `savewatch config`: show where configuration came from and what is in effect.

use super::LoadedConfig;
use savewatch_core::Config;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration with every default resolved.
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub monitored_folder: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub extensions_dir: Option<PathBuf>,
    pub line_threshold: i64,
    pub time_threshold_ms: i64,
    pub char_threshold: u64,
    pub per_file_history_cap: usize,
    pub working_set_cap: usize,
    pub retention_days: u32,
    pub ai_scan_interval_ms: u64,
}

impl From<&Config> for EffectiveConfig {
    fn from(config: &Config) -> Self {
        let thresholds = config.thresholds();
        let store = config.store_config();
        Self {
            monitored_folder: config.monitored_folder().map(PathBuf::from),
            storage_dir: config.storage_dir().ok(),
            extensions_dir: config.extensions_dir(),
            line_threshold: thresholds.line_threshold,
            time_threshold_ms: thresholds.time_threshold_ms,
            char_threshold: thresholds.char_threshold,
            per_file_history_cap: store.per_file_history_cap,
            working_set_cap: store.working_set_cap,
            retention_days: config.retention_days(),
            ai_scan_interval_ms: config.scan_interval().as_millis() as u64,
        }
    }
}

/// Print configuration sources, warnings and the effective settings as JSON.
pub fn show_config(loaded: &LoadedConfig) {
    println!("Configuration sources:");
    if loaded.sources.is_empty() {
        println!("  (none)");
    } else {
        for source in &loaded.sources {
            println!("  {}", source.display());
        }
    }
    println!();

    let warnings = loaded.config.validate();
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in &warnings {
            println!("  {warning}");
        }
        println!();
    }

    println!("Effective configuration:");
    match serde_json::to_string_pretty(&EffectiveConfig::from(&loaded.config)) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Could not serialize configuration: {e}"),
    }
}
