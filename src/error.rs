use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds surfaced to callers of the image endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Access code missing or not in the configured list
    InvalidAccessCode,
    /// No API key could be resolved for the selected provider
    #[serde(rename = "NoAPIKey")]
    NoApiKey,
    /// Upstream provider rejected or failed the generation call
    #[serde(rename = "OpenAIBizError")]
    OpenAiBizError,
    /// Any other failure; details stay in the server log
    InternalServerError,
}

impl ErrorKind {
    /// HTTP status associated with this kind
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAccessCode | Self::NoApiKey => StatusCode::UNAUTHORIZED,
            // Non-standard status so clients can tell upstream failures apart
            Self::OpenAiBizError => {
                StatusCode::from_u16(577).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAccessCode => "InvalidAccessCode",
            Self::NoApiKey => "NoAPIKey",
            Self::OpenAiBizError => "OpenAIBizError",
            Self::InternalServerError => "InternalServerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error body returned in place of a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            error_type: kind,
            body: None,
        }
    }

    /// Error response carrying extra diagnostic JSON for the caller
    pub fn with_body(kind: ErrorKind, body: serde_json::Value) -> Self {
        Self {
            error_type: kind,
            body: Some(body),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        crate::metrics::record_error(self.error_type.as_str());
        (self.error_type.status(), Json(self)).into_response()
    }
}

impl From<ErrorKind> for ErrorResponse {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
