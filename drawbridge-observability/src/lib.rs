pub mod metrics;
pub mod tracing;

pub use metrics::{
    bridge_metrics, gather_metrics, init_metrics, metrics_enabled, BridgeMetrics, CommandOutcome,
    REGISTRY,
};
pub use tracing::{init_tracing, shutdown_tracing, LogFormat, TracingConfig, DEFAULT_LOG_FILTER};

/// Basic initialization for minimal overhead
pub fn init_basic_observability(service_name: &str, enable_tracing: bool, enable_metrics: bool) {
    if enable_metrics {
        init_metrics();
    }

    if enable_tracing {
        if let Err(e) = init_tracing(TracingConfig::from_env(service_name)) {
            eprintln!("Failed to initialize tracing: {e}");
            init_minimal_logging();
        }
    } else {
        init_minimal_logging();
    }
}

/// Minimal logging setup without metrics or OpenTelemetry infrastructure
pub fn init_minimal_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // try_init: embedding applications may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
