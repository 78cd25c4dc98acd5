pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod server;
pub mod signals;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over `default_level`. Can only be called once.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
