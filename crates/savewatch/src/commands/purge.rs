//! `savewatch purge`: one expiry sweep over the snapshot storage root.

use savewatch_core::Config;
use savewatch_storage::FsStorage;

pub async fn run_purge(config: &Config, days: Option<u32>) -> anyhow::Result<()> {
    let days = days.unwrap_or_else(|| config.retention_days());
    let root = config.storage_dir()?;

    let report = savewatch_snapshot::purge_expired(&FsStorage::new(), &root, days).await;

    if report.removed.is_empty() {
        println!("Nothing older than {days} day(s) under {}", root.display());
    } else {
        println!("Removed {} directories:", report.removed.len());
        for dir in &report.removed {
            println!("  {}", dir.display());
        }
    }
    if report.failed > 0 {
        println!("{} entries could not be removed, see log", report.failed);
    }
    Ok(())
}
