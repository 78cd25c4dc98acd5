use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::images::AppState;

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "image-gateway",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Readiness probe: reports which upstream the server configuration prefers
/// and whether server-side keys are present for it
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.load();
    let azure = config.azure.use_azure_openai;
    let server_key = if azure {
        config.azure.api_key.is_some()
    } else {
        config.openai.api_key.is_some()
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "service": "image-gateway",
            "default_provider": if azure { "azure_openai" } else { "openai" },
            "server_key_configured": server_key,
            "access_code_required": !config.access_codes.is_empty(),
        })),
    )
}
