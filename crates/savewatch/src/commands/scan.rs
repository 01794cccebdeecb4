//! `savewatch scan`: one pass of the AI extension scanner.

use anyhow::Context;
use savewatch_core::{Config, ExtensionScanner};
use std::path::PathBuf;

pub async fn run_scan(config: &Config, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let dir = dir
        .or_else(|| config.extensions_dir())
        .context("could not determine the extensions directory, pass --dir")?;

    let report = ExtensionScanner::new(dir).scan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Scanned {} extension(s) in {}",
        report.scanned,
        report.directory.display()
    );
    if report.detected.is_empty() {
        println!("No AI coding extensions found");
    } else {
        println!("AI coding extensions found:");
        for id in &report.detected {
            println!("  {id}");
        }
    }
    Ok(())
}
