use crate::{
    error::{ErrorKind, ErrorResponse},
    logging::desensitize_url,
    models::openai::{ImageGenerationPayload, ImagesResponse},
    providers::ProviderClient,
};
use async_trait::async_trait;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Performs the actual generation call once a client has been built.
///
/// Owns the shape of both the success and the failure response.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, client: ProviderClient, payload: ImageGenerationPayload) -> Response;
}

/// Calls the OpenAI-compatible Images API and answers with a JSON array of image URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAIImageGeneration;

#[async_trait]
impl GenerationService for OpenAIImageGeneration {
    async fn generate(&self, client: ProviderClient, payload: ImageGenerationPayload) -> Response {
        match generate_image_urls(&client, &payload).await {
            Ok(urls) => {
                tracing::info!(
                    provider = %client.variant(),
                    model = %payload.model,
                    images = urls.len(),
                    "Image generation succeeded"
                );
                Json(urls).into_response()
            }
            Err(error) => {
                tracing::error!(
                    provider = %client.variant(),
                    model = %payload.model,
                    error = %error,
                    "Image generation failed"
                );
                ErrorResponse::with_body(
                    ErrorKind::OpenAiBizError,
                    json!({
                        "error": error,
                        "endpoint": desensitize_url(client.base_url().as_str()),
                    }),
                )
                .into_response()
            }
        }
    }
}

/// Run the upstream call and reduce the result to image locations.
///
/// Failures are returned as JSON describing the upstream error.
async fn generate_image_urls(
    client: &ProviderClient,
    payload: &ImageGenerationPayload,
) -> Result<Vec<String>, Value> {
    let response = client
        .generate_images(payload)
        .await
        .map_err(|e| transport_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(upstream_error(status.as_u16(), &text));
    }

    let body: ImagesResponse = response.json().await.map_err(|e| {
        json!({
            "name": "ResponseParseError",
            "message": e.to_string(),
        })
    })?;

    Ok(body.data.iter().filter_map(|d| d.location()).collect())
}

/// Prefer the upstream's own `error` object; fall back to the raw body
fn upstream_error(status: u16, text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut obj)) => match obj.remove("error") {
            Some(inner) => inner,
            None => Value::Object(obj),
        },
        _ => json!({
            "status": status,
            "message": text,
        }),
    }
}

fn transport_error(error: &reqwest::Error) -> Value {
    let name = if error.is_timeout() {
        "TimeoutError"
    } else if error.is_connect() {
        "ConnectionError"
    } else {
        "FetchError"
    };
    json!({
        "name": name,
        "message": error.to_string(),
    })
}
