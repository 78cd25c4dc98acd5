use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "image_requests_total",
        "Total number of image generation requests that reached provider selection"
    );
    describe_counter!(
        "image_errors_total",
        "Total number of structured error responses"
    );
    describe_histogram!(
        "image_request_duration_seconds",
        "Image generation duration in seconds"
    );
    describe_gauge!(
        "image_gateway_info",
        "Gateway version and build information"
    );

    gauge!("image_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a request routed to a provider variant.
///
/// Labels stay bounded: the model name comes from the caller and is not recorded.
pub fn record_request(variant: &str) {
    counter!(
        "image_requests_total",
        "variant" => variant.to_string(),
    )
    .increment(1);
}

/// Record request duration
pub fn record_duration(variant: &str, duration: Duration) {
    histogram!(
        "image_request_duration_seconds",
        "variant" => variant.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record an error response by kind
pub fn record_error(kind: &str) {
    counter!(
        "image_errors_total",
        "kind" => kind.to_string(),
    )
    .increment(1);
}
