//! Serve subcommand implementation

use anyhow::{Context, Result};
use clap::Args;
use drawbridge::Server;
use drawbridge_common::{DEFAULT_BIND, DEFAULT_REMOTE_CONTROL_PATH};
use drawbridge_observability::{
    gather_metrics, init_basic_observability, init_minimal_logging, shutdown_tracing,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the gateway to
    #[arg(long, default_value = DEFAULT_BIND, env = "DRAWBRIDGE_BIND")]
    pub bind: SocketAddr,

    /// Path remote-control clients connect to
    #[arg(long, default_value = DEFAULT_REMOTE_CONTROL_PATH, env = "DRAWBRIDGE_PATH")]
    pub path: String,

    /// Per-command deadline in seconds
    #[arg(long, default_value_t = 30, env = "DRAWBRIDGE_REQUEST_TIMEOUT")]
    pub request_timeout_secs: u64,

    /// Metrics bind address
    #[arg(long, default_value = "127.0.0.1:9090", env = "DRAWBRIDGE_METRICS_BIND")]
    pub metrics_bind: SocketAddr,

    /// Enable tracing export (metrics is separate via --metrics)
    #[arg(long, env = "DRAWBRIDGE_OBSERVABILITY")]
    pub observability: bool,

    /// Enable metrics endpoint
    #[arg(long, env = "DRAWBRIDGE_METRICS")]
    pub metrics: bool,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let enable_tracing = args.observability;
    let enable_metrics = args.metrics;

    if enable_tracing || enable_metrics {
        init_basic_observability("drawbridge-server", enable_tracing, enable_metrics);
    } else {
        init_minimal_logging();
    }

    if enable_metrics {
        // Start metrics endpoint in background (only when metrics is enabled)
        let metrics_addr = args.metrics_bind;
        tokio::spawn(async move {
            use axum::{routing::get, Router};
            let app = Router::new()
                .route("/metrics", get(|| async { gather_metrics() }))
                .route("/health/ready", get(|| async { "OK" }));
            info!("Metrics server listening on http://{}", metrics_addr);
            match tokio::net::TcpListener::bind(metrics_addr).await {
                Ok(listener) => {
                    if let Err(e) = axum::serve(listener, app).await {
                        error!("Metrics server error: {}", e);
                    }
                }
                Err(e) => error!("Failed to bind metrics server to {}: {}", metrics_addr, e),
            }
        });
    }

    info!("Starting Drawbridge Server v{}", env!("CARGO_PKG_VERSION"));

    let mut server = Server::builder()
        .bind(args.bind)
        .path(args.path)
        .request_timeout(Duration::from_secs(args.request_timeout_secs))
        .build()
        .context("invalid server configuration")?;

    server
        .start()
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutdown requested");

    server.shutdown().await?;
    shutdown_tracing();
    Ok(())
}
