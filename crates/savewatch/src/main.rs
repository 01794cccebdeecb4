//! savewatch - flag bulk-pasted code as it is saved.
//!
//! This is the main entry point for the savewatch CLI.

mod commands;
mod debounce;

use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "savewatch")]
#[command(author, version, about = "Watch a folder for saves and flag bulk-pasted code", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the snapshot storage directory
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a folder and record every save
    Watch {
        /// Folder to monitor (defaults to the configured folder, then the current directory)
        dir: Option<PathBuf>,
        /// Quiet period before a changed file is treated as saved, in milliseconds
        #[arg(long, default_value_t = 300)]
        debounce_ms: u64,
        /// Do not scan for AI coding extensions
        #[arg(long)]
        no_scan: bool,
    },
    /// Show persisted snapshot sessions
    Status,
    /// Delete expired snapshot directories
    Purge {
        /// Maximum age in days (defaults to the configured retention)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Scan for installed AI coding extensions
    Scan {
        /// Extensions directory (defaults to ~/.vscode/extensions)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    // Project config lives in the watched folder when one is given.
    let project_dir = match &cli.command {
        Commands::Watch { dir: Some(dir), .. } => cwd.join(dir),
        _ => cwd.clone(),
    };
    let loaded = load_config(
        &project_dir,
        &Overrides {
            storage_dir: cli.storage_dir,
        },
    )
    .await?;
    init_logging(cli.verbose, loaded.config.log_level);

    match cli.command {
        Commands::Watch {
            dir,
            debounce_ms,
            no_scan,
        } => {
            run_watch(
                loaded.config,
                WatchOptions {
                    folder: dir.map(|_| project_dir),
                    fallback: cwd,
                    debounce: std::time::Duration::from_millis(debounce_ms),
                    scan: !no_scan,
                },
            )
            .await
        }
        Commands::Status => show_status(&loaded.config).await,
        Commands::Purge { days } => run_purge(&loaded.config, days).await,
        Commands::Scan { dir, json } => run_scan(&loaded.config, dir, json).await,
        Commands::Config => {
            show_config(&loaded);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Print version information.
fn print_version() {
    println!("savewatch {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Records file saves and flags suspicious bulk edits.");
}
