use super::{non_empty, parse_endpoint, ClientError, ProviderClient, ProviderVariant};
use crate::config::{Config, DEFAULT_AZURE_API_VERSION};
use reqwest::Client;
use std::time::Duration;

/// Request-level inputs for building an Azure OpenAI client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AzureClientParams<'a> {
    pub endpoint: Option<&'a str>,
    pub api_version: Option<&'a str>,
    /// Payload model; doubles as the deployment name
    pub model: &'a str,
    pub user_api_key: Option<&'a str>,
}

/// Build an Azure OpenAI client.
///
/// URL pattern: `{endpoint}/openai/deployments/{deployment}/images/generations?api-version={api_version}`
/// Auth: `api-key` header
pub fn create_azure_openai(
    http: &Client,
    config: &Config,
    params: AzureClientParams<'_>,
) -> Result<ProviderClient, ClientError> {
    let api_key = non_empty(params.user_api_key)
        .or_else(|| non_empty(config.azure.api_key.as_deref()))
        .ok_or(ClientError::MissingCredential("AZURE_API_KEY"))?;

    let endpoint = non_empty(params.endpoint)
        .or_else(|| non_empty(config.openai.proxy_url.as_deref()))
        .ok_or_else(|| ClientError::InvalidEndpoint {
            endpoint: String::new(),
            reason: "no Azure endpoint configured".to_string(),
        })?;

    let deployment = deployment_name(params.model)?;

    let mut base_url = parse_endpoint(endpoint)?;
    if let Ok(mut segments) = base_url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push("openai")
            .push("deployments")
            .push(&deployment);
    }

    let api_version = non_empty(params.api_version)
        .or_else(|| non_empty(config.azure.api_version.as_deref()))
        .unwrap_or(DEFAULT_AZURE_API_VERSION);

    tracing::debug!(
        base_url = %base_url,
        deployment = %deployment,
        api_version = %api_version,
        user_key = non_empty(params.user_api_key).is_some(),
        "Created Azure OpenAI client"
    );

    Ok(ProviderClient::new(
        ProviderVariant::AzureOpenAI,
        http.clone(),
        base_url,
        api_key.to_string(),
        Some(api_version),
        Duration::from_secs(config.openai.timeout_seconds),
    ))
}

/// Azure deployment names cannot contain dots ("gpt-3.5" is deployed as "gpt-35")
fn deployment_name(model: &str) -> Result<String, ClientError> {
    let deployment = model.trim().replace('.', "");
    if deployment.is_empty() || deployment.contains('/') {
        return Err(ClientError::InvalidDeployment(model.to_string()));
    }
    Ok(deployment)
}
