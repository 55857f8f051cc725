//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `bgp_indexer` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use bgp_indexer::initialization::init_logger_with;
use bgp_indexer::{run_pipeline, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting ELASTIC_API_KEY in .env without exporting it manually
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_pipeline(config).await {
        Ok(report) => {
            println!(
                "✅ Indexed {} of {} record{} in {:.1}s ({} parse failures, {} invalid prefixes, {} dead-lettered)",
                report.indexed,
                report.records,
                if report.records == 1 { "" } else { "s" },
                report.elapsed_seconds,
                report.parse_failures,
                report.invalid_prefixes,
                report.dead_lettered
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("bgp_indexer error: {:#}", e);
            process::exit(1);
        }
    }
}
