use std::process;

use anyhow::Context;
use sqlbackup_core::{BackupConfig, Exporter};
use tracing::info;
use tracing_subscriber::prelude::*;

fn load_config() -> anyhow::Result<BackupConfig> {
    let config = match BackupConfig::find_and_load().context("reading .sqlbackup.toml")? {
        Some((path, config)) => {
            info!("Using configuration from {}", path.display());
            config
        }
        None => BackupConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Export failed: {:#}", e);
            process::exit(1);
        }
    };

    match Exporter::new(config).run().await {
        Ok(summary) => {
            println!();
            println!("✅ Export succeeded");
            println!("📁 File: {}", summary.path.display());
            println!("📊 Size: {:.2} MB", summary.size_mib());
            for table in summary.failed_tables() {
                println!("⚠️  Skipped {}: {}", table.name, table.error.as_deref().unwrap_or(""));
            }
        }
        Err(e) => {
            println!("❌ {}", e.user_message());
            process::exit(1);
        }
    }
}
