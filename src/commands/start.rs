use anyhow::{Context, Result};
use colored::Colorize;
use image_gateway::{config, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads and validates the configuration, then serves until a shutdown signal.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting image gateway...".green());

    let cfg = config::load_config_from(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    info!(config = %config_path.display(), "Configuration loaded");

    server::start_server(cfg, config_path.to_path_buf()).await
}
