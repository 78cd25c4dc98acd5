use arc_swap::ArcSwap;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use image_gateway::{
    config::{AzureConfig, Config, MetricsConfig, OpenAIConfig, ServerConfig},
    handlers::images::AppState,
    server::{create_router, IMAGES_ROUTE},
};
use std::sync::Arc;

/// Config pointing the OpenAI provider at `proxy_url`
pub fn create_test_config(proxy_url: Option<String>, server_key: Option<&str>) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3210,
            log_level: "info".to_string(),
        },
        access_codes: vec!["valid".to_string()],
        openai: OpenAIConfig {
            api_key: server_key.map(str::to_string),
            proxy_url,
            timeout_seconds: 5,
        },
        azure: AzureConfig::default(),
        metrics: MetricsConfig {
            enabled: false,
            endpoint: "/metrics".to_string(),
        },
    }
}

pub fn build_app(config: Config) -> Router {
    let state = AppState {
        config: Arc::new(ArcSwap::from_pointee(config.clone())),
        http_client: reqwest::Client::new(),
    };
    create_router(state, &config, None)
}

/// JSON POST to the image route with the given extra headers
pub fn image_request(headers: &[(&str, &str)], body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(IMAGES_ROUTE)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
