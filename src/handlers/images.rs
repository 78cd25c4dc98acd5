use crate::{
    auth::{extract_auth, ConfigAuthenticator},
    config::Config,
    dispatcher::Dispatcher,
    generation::OpenAIImageGeneration,
    models::openai::ImageGenerationPayload,
    providers::HttpClientFactory,
};
use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::HeaderMap,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::Instrument;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    /// Shared connection pool; provider clients are cheap wrappers around it
    pub http_client: reqwest::Client,
}

/// Handle POST /api/openai/images
///
/// A malformed body is rejected by the `Json` extractor before this runs.
pub async fn handle_image_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImageGenerationPayload>,
) -> Response {
    // Single config snapshot for the whole request
    let config = state.config.load_full();
    let auth = extract_auth(&headers);

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("image_generation", %request_id, model = %payload.model);

    let dispatcher = Dispatcher::new(
        ConfigAuthenticator::new(&config),
        HttpClientFactory::new(config.clone(), state.http_client.clone()),
        OpenAIImageGeneration,
    );

    dispatcher
        .handle(&config, &auth, payload)
        .instrument(span)
        .await
}
