use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    handlers::{self, images::AppState},
    metrics,
    signals::setup_signal_handlers,
};

/// Route serving image generation requests
pub const IMAGES_ROUTE: &str = "/api/openai/images";
pub const HEALTH_ROUTE: &str = "/health";
pub const READY_ROUTE: &str = "/ready";

/// Paths owned by the gateway itself; the metrics endpoint must not reuse them
pub const RESERVED_ROUTES: [&str; 3] = [IMAGES_ROUTE, HEALTH_ROUTE, READY_ROUTE];

/// Start the image gateway server
///
/// This function:
/// 1. Initializes metrics
/// 2. Sets up signal handlers for graceful shutdown and config reload
/// 3. Creates the Axum application
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    // SIGTERM, SIGINT for shutdown; SIGHUP for reload
    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone(), config_path);
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app_state = AppState {
        config: config_swap,
        http_client: reqwest::Client::new(),
    };

    let app = create_router(app_state, &config, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting image gateway on {}", addr);
    info!(
        "Configuration: {} access codes, server OpenAI key: {}, Azure forced: {}",
        config.access_codes.len(),
        config.openai.api_key.is_some(),
        config.azure.use_azure_openai
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    app_state: AppState,
    config: &Config,
    metrics_handle: Option<Arc<PrometheusHandle>>,
) -> Router {
    let api_routes = Router::new()
        .route(IMAGES_ROUTE, post(handlers::images::handle_image_generation))
        .route(HEALTH_ROUTE, get(handlers::health::health_check))
        .route(READY_ROUTE, get(handlers::health::readiness_check))
        .with_state(app_state);

    let mut app = Router::new().merge(api_routes);

    if let Some(handle) = metrics_handle {
        app = app.merge(
            Router::new()
                .route(
                    &config.metrics.endpoint,
                    get(handlers::metrics_handler::metrics),
                )
                .with_state(handle),
        );
    }

    app
        // Prompts are small; cap bodies at 1MB
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
