use super::{non_empty, parse_endpoint, ClientError, ProviderClient, ProviderVariant};
use crate::config::Config;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Build a standard OpenAI client.
///
/// Key: the user's key, else the server key. Base URL: the request endpoint,
/// else the configured proxy URL, else api.openai.com.
pub fn create_openai(
    http: &Client,
    config: &Config,
    user_api_key: Option<&str>,
    endpoint: Option<&str>,
) -> Result<ProviderClient, ClientError> {
    let api_key = non_empty(user_api_key)
        .or_else(|| non_empty(config.openai.api_key.as_deref()))
        .ok_or(ClientError::MissingCredential("OPENAI_API_KEY"))?;

    let base = non_empty(endpoint)
        .or_else(|| non_empty(config.openai.proxy_url.as_deref()))
        .unwrap_or(DEFAULT_BASE_URL);
    let base_url = parse_endpoint(base)?;

    tracing::debug!(
        base_url = %base_url,
        user_key = non_empty(user_api_key).is_some(),
        "Created OpenAI client"
    );

    Ok(ProviderClient::new(
        ProviderVariant::OpenAI,
        http.clone(),
        base_url,
        api_key.to_string(),
        None,
        Duration::from_secs(config.openai.timeout_seconds),
    ))
}
