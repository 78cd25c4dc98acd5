pub mod azure_openai;
pub mod openai;

use crate::{config::Config, logging::SensitiveApiKey, models::openai::ImageGenerationPayload};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

pub use azure_openai::AzureClientParams;

/// Upstream flavour a request is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderVariant {
    /// api.openai.com or an OpenAI-compatible proxy
    OpenAI,
    /// Azure-hosted deployment of the same API
    AzureOpenAI,
}

impl ProviderVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::AzureOpenAI => "azure_openai",
        }
    }
}

impl fmt::Display for ProviderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the upstream variant for a request.
///
/// Either flag selects Azure; a request cannot opt out of Azure when the
/// server configuration enables it.
pub fn select_variant(request_flag: bool, config_flag: bool) -> ProviderVariant {
    if request_flag || config_flag {
        ProviderVariant::AzureOpenAI
    } else {
        ProviderVariant::OpenAI
    }
}

/// Client construction failures
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Neither the request nor the server configuration supplied a key
    #[error("{0} is empty")]
    MissingCredential(&'static str),
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("invalid deployment name for model '{0}'")]
    InvalidDeployment(String),
}

/// How the client authenticates against its upstream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthStyle {
    Bearer,
    ApiKeyHeader,
}

/// Handle for issuing image generation calls against one upstream.
///
/// Built per request and never shared between requests.
#[derive(Clone)]
pub struct ProviderClient {
    variant: ProviderVariant,
    http: Client,
    base_url: Url,
    images_url: Url,
    api_key: String,
    auth_style: AuthStyle,
    timeout: Duration,
}

impl ProviderClient {
    /// Assemble a client from already-resolved parts
    pub fn new(
        variant: ProviderVariant,
        http: Client,
        base_url: Url,
        api_key: String,
        api_version: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let mut images_url = base_url.clone();
        if let Ok(mut segments) = images_url.path_segments_mut() {
            segments.pop_if_empty().push("images").push("generations");
        }
        if let Some(version) = api_version {
            images_url.query_pairs_mut().append_pair("api-version", version);
        }

        let auth_style = match variant {
            ProviderVariant::OpenAI => AuthStyle::Bearer,
            ProviderVariant::AzureOpenAI => AuthStyle::ApiKeyHeader,
        };

        Self {
            variant,
            http,
            base_url,
            images_url,
            api_key,
            auth_style,
            timeout,
        }
    }

    pub fn variant(&self) -> ProviderVariant {
        self.variant
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the image generation call, including any query parameters
    pub fn images_url(&self) -> &Url {
        &self.images_url
    }

    /// Call the upstream Images API.
    ///
    /// Status codes are not checked here; the generation service interprets them.
    pub async fn generate_images(
        &self,
        payload: &ImageGenerationPayload,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut req = self
            .http
            .post(self.images_url.clone())
            .header("Content-Type", "application/json")
            .timeout(self.timeout);

        req = match self.auth_style {
            AuthStyle::Bearer => req.header("Authorization", format!("Bearer {}", self.api_key)),
            // Azure uses api-key header (not Bearer)
            AuthStyle::ApiKeyHeader => req.header("api-key", &self.api_key),
        };

        req.json(payload).send().await
    }
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("variant", &self.variant)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &SensitiveApiKey::new(&self.api_key).to_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builds provider clients for either upstream variant
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Standard OpenAI client from the user's key and endpoint, falling back to server defaults
    async fn create_openai(
        &self,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<ProviderClient, ClientError>;

    /// Azure OpenAI client for the deployment named by the payload model
    async fn create_azure_openai(
        &self,
        params: AzureClientParams<'_>,
    ) -> Result<ProviderClient, ClientError>;
}

/// Factory backed by a configuration snapshot and the shared HTTP connection pool
pub struct HttpClientFactory {
    config: Arc<Config>,
    http: Client,
}

impl HttpClientFactory {
    pub fn new(config: Arc<Config>, http: Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn create_openai(
        &self,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<ProviderClient, ClientError> {
        openai::create_openai(&self.http, &self.config, api_key, endpoint)
    }

    async fn create_azure_openai(
        &self,
        params: AzureClientParams<'_>,
    ) -> Result<ProviderClient, ClientError> {
        azure_openai::create_azure_openai(&self.http, &self.config, params)
    }
}

/// Parse an absolute http(s) base URL
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    Ok(url)
}

/// Treat empty strings the same as absent values
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
