//! Fraud Scoring Service - Main Entry Point

use anyhow::{Context, Result};
use api::{init_logging, run_server, ServiceConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional TOML config path as the only argument
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = ServiceConfig::load(path.as_deref())
        .context("Failed to load service configuration")?;
    init_logging(&config.logging);

    info!("=== Fraud Scoring API v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(config).await
}
