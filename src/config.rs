use serde::{Deserialize, Serialize};
use std::path::Path;

/// Azure API version used when neither the request nor the config names one
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-08-01-preview";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Access codes accepted in place of an API key. Empty disables the check.
    #[serde(default)]
    pub access_codes: Vec<String>,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIConfig {
    /// Server-side key used when the request carries none
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for both providers when the request names no endpoint
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            proxy_url: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AzureConfig {
    /// Forces the Azure variant for every request
    #[serde(default)]
    pub use_azure_openai: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/metrics".to_string(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the log level before tracing is up.
///
/// The CLI flag wins, then `server.log_level` from the config file. A config file
/// that cannot be loaded falls back to the default; the command reports that error
/// itself once logging is running.
pub fn resolve_log_level(cli_level: Option<&str>, config_path: &Path) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    load_config_from(config_path)
        .map(|cfg| cfg.server.log_level)
        .unwrap_or_else(|_| default_log_level())
}

/// Load configuration from a file, overlaid with `IMAGE_GATEWAY__*` environment variables
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("IMAGE_GATEWAY")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("access_codes")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port must be non-zero");
    }

    if cfg.openai.timeout_seconds == 0 {
        anyhow::bail!("OpenAI timeout_seconds must be greater than zero");
    }

    if let Some(proxy_url) = &cfg.openai.proxy_url {
        if let Err(e) = url::Url::parse(proxy_url) {
            anyhow::bail!("Invalid OpenAI proxy_url '{}': {}", proxy_url, e);
        }
    }

    if cfg.access_codes.iter().any(|code| code.is_empty()) {
        anyhow::bail!("Access codes cannot be empty strings");
    }

    if cfg.metrics.enabled && !cfg.metrics.endpoint.starts_with('/') {
        anyhow::bail!(
            "Metrics endpoint '{}' must start with '/'",
            cfg.metrics.endpoint
        );
    }

    if cfg.metrics.enabled
        && crate::server::RESERVED_ROUTES
            .iter()
            .any(|route| cfg.metrics.endpoint.trim_end_matches('/') == *route)
    {
        anyhow::bail!(
            "Metrics endpoint '{}' collides with a built-in route",
            cfg.metrics.endpoint
        );
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3210,
            log_level: default_log_level(),
        },
        access_codes: vec![],
        openai: OpenAIConfig::default(),
        azure: AzureConfig::default(),
        metrics: MetricsConfig::default(),
    }
}
