//! patron-sync - Patron tier sync
//!
//! Invoked on a schedule with no arguments. Exits 0 after rewriting the
//! output files, non-zero on any configuration, fetch or write failure
//! (in which case the previous outputs are left as they were).

use anyhow::{Context, Result};
use clap::Parser;
use patron_common::config::{ConfigFile, ConfigOverrides, SyncConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for patron-sync
#[derive(Parser, Debug)]
#[command(name = "patron-sync")]
#[command(about = "Sync active supporters into tiered CSV and JSON files")]
#[command(version)]
struct Args {
    /// TOML config file (default: ./patron-sync.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (default: _data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TOML file may carry the log level, so read it before the subscriber exists
    let config_file = ConfigFile::load(args.config.as_deref());
    let default_level = config_file.log_level().unwrap_or("info").to_string();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting patron-sync {}", env!("CARGO_PKG_VERSION"));

    let overrides = ConfigOverrides {
        data_dir: args.data_dir,
    };
    let config =
        SyncConfig::resolve(&overrides, config_file).context("Failed to resolve configuration")?;
    info!(
        campaign_id = %config.campaign_id,
        data_dir = %config.data_dir.display(),
        "Configuration resolved"
    );

    let summary = patron_sync::run(&config, patron_common::time::now())
        .await
        .context("Patron sync failed")?;

    info!(
        fetched = summary.fetched,
        files = summary.files.len(),
        "All patron data updated successfully"
    );

    Ok(())
}
