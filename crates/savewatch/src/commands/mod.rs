//! Command handlers for the savewatch CLI.

pub mod config;
pub mod logging;
pub mod purge;
pub mod scan;
pub mod status;
pub mod watch;

pub use config::*;
pub use logging::*;
pub use purge::*;
pub use scan::*;
pub use status::*;
pub use watch::*;

use savewatch_core::Config;
use std::path::{Path, PathBuf};

/// Command line settings that take precedence over config files.
#[derive(Debug, Default)]
pub struct Overrides {
    pub storage_dir: Option<PathBuf>,
}

/// Merged configuration and the files it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub sources: Vec<PathBuf>,
}

/// Load configuration for `dir` and apply command line overrides.
pub async fn load_config(dir: &Path, overrides: &Overrides) -> anyhow::Result<LoadedConfig> {
    let (mut config, sources) = Config::load(Some(dir)).await?;
    if let Some(storage_dir) = &overrides.storage_dir {
        config.storage_dir = Some(storage_dir.clone());
    }
    Ok(LoadedConfig { config, sources })
}
