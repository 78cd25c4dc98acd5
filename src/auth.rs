use crate::{config::Config, error::ErrorKind};
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

pub const API_KEY_HEADER: &str = "x-openai-api-key";
pub const ACCESS_CODE_HEADER: &str = "x-lobe-chat-access-code";
pub const ENDPOINT_HEADER: &str = "x-openai-end-point";
pub const USE_AZURE_HEADER: &str = "x-use-azure-openai";
pub const AZURE_API_VERSION_HEADER: &str = "x-azure-api-version";

/// Credentials and provider hints carried by a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMaterial {
    pub api_key: Option<String>,
    pub access_code: Option<String>,
    pub endpoint: Option<String>,
    pub use_azure: bool,
    pub api_version: Option<String>,
}

impl AuthMaterial {
    pub fn credentials(&self) -> Credentials<'_> {
        Credentials {
            access_code: self.access_code.as_deref(),
            api_key: self.api_key.as_deref(),
        }
    }
}

/// The subset of [`AuthMaterial`] the authenticator looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub access_code: Option<&'a str>,
    pub api_key: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Authorized,
    Denied(ErrorKind),
}

/// Decides whether a request may proceed to provider selection
pub trait Authenticator: Send + Sync {
    fn check_auth(&self, credentials: &Credentials<'_>) -> AuthResult;
}

/// Extract auth material from request headers.
///
/// Absent, empty, or non-UTF-8 headers are treated as not supplied.
pub fn extract_auth(headers: &HeaderMap) -> AuthMaterial {
    AuthMaterial {
        api_key: header_value(headers, API_KEY_HEADER),
        access_code: header_value(headers, ACCESS_CODE_HEADER),
        endpoint: header_value(headers, ENDPOINT_HEADER),
        use_azure: header_value(headers, USE_AZURE_HEADER)
            .map(|v| is_truthy(&v))
            .unwrap_or(false),
        api_version: header_value(headers, AZURE_API_VERSION_HEADER),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Authenticator backed by the configured access code list
pub struct ConfigAuthenticator<'a> {
    config: &'a Config,
}

impl<'a> ConfigAuthenticator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }
}

impl Authenticator for ConfigAuthenticator<'_> {
    fn check_auth(&self, credentials: &Credentials<'_>) -> AuthResult {
        // User-supplied keys skip the access code check
        if credentials.api_key.is_some_and(|k| !k.is_empty()) {
            return AuthResult::Authorized;
        }

        if self.config.access_codes.is_empty() {
            return AuthResult::Authorized;
        }

        match credentials.access_code {
            Some(code) if access_code_matches(&self.config.access_codes, code) => {
                AuthResult::Authorized
            }
            _ => AuthResult::Denied(ErrorKind::InvalidAccessCode),
        }
    }
}

/// Constant-time membership test over every configured code
fn access_code_matches(codes: &[String], candidate: &str) -> bool {
    codes.iter().fold(false, |found, code| {
        found | bool::from(code.as_bytes().ct_eq(candidate.as_bytes()))
    })
}
