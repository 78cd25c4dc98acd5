use anyhow::Result;
use colored::Colorize;
use image_gateway::config::{self, Config};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config_from(config_path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Mask every credential in the configuration for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();

    sanitized.openai.api_key = sanitized.openai.api_key.as_deref().map(mask_api_key);
    sanitized.azure.api_key = sanitized.azure.api_key.as_deref().map(mask_api_key);
    sanitized.access_codes = sanitized
        .access_codes
        .iter()
        .map(|code| mask_api_key(code))
        .collect();

    sanitized
}

/// Mask an API key for safe display
///
/// Shows first 7 and last 4 characters with asterisks in between
/// Example: "sk-1234567890abcdef" -> "sk-1234...cdef"
fn mask_api_key(key: &str) -> String {
    if key.len() <= 11 || !key.is_char_boundary(7) || !key.is_char_boundary(key.len() - 4) {
        // Too short to mask meaningfully
        return "***".to_string();
    }

    let prefix = &key[..7];
    let suffix = &key[key.len() - 4..];

    format!("{}...{}", prefix, suffix)
}
