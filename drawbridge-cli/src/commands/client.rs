//! Client subcommand implementation
//!
//! A headless remote-control client over an in-memory diagram, useful for
//! exercising a tool layer without the editor running.

use anyhow::{Context, Result};
use clap::Args;
use drawbridge::core::client::{ClientEvent, DiagramDocument};
use drawbridge::Client;
use drawbridge_common::DEFAULT_REMOTE_CONTROL_PATH;
use drawbridge_observability::{init_basic_observability, init_minimal_logging, shutdown_tracing};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Bridge URL (ws:// or wss://)
    #[arg(
        long,
        env = "DRAWBRIDGE_URL",
        required_unless_present = "origin",
        conflicts_with = "origin"
    )]
    pub url: Option<String>,

    /// Page origin to derive the bridge URL from (http:// or https://)
    #[arg(long, env = "DRAWBRIDGE_ORIGIN")]
    pub origin: Option<String>,

    /// Path appended to the origin
    #[arg(long, default_value = DEFAULT_REMOTE_CONTROL_PATH, env = "DRAWBRIDGE_PATH")]
    pub path: String,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = 10, env = "DRAWBRIDGE_MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// Seconds between heartbeat pings
    #[arg(long, default_value_t = 30, env = "DRAWBRIDGE_HEARTBEAT")]
    pub heartbeat_secs: u64,

    /// Do not reconnect after the connection drops
    #[arg(long)]
    pub no_reconnect: bool,

    /// Enable tracing export
    #[arg(long, env = "DRAWBRIDGE_OBSERVABILITY")]
    pub observability: bool,
}

pub async fn run(args: ClientArgs) -> Result<()> {
    if args.observability {
        init_basic_observability("drawbridge-client", true, false);
    } else {
        init_minimal_logging();
    }

    info!("Starting Drawbridge Client v{}", env!("CARGO_PKG_VERSION"));

    let mut builder = Client::builder()
        .path(args.path)
        .max_attempts(args.max_attempts)
        .auto_reconnect(!args.no_reconnect)
        .heartbeat_interval(Duration::from_secs(args.heartbeat_secs));
    if let Some(url) = args.url {
        builder = builder.url(url);
    }
    if let Some(origin) = args.origin {
        builder = builder.origin(origin);
    }
    let mut client = builder.build().context("invalid client configuration")?;

    let mut events = client.subscribe();
    client.remote().enable()?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(ClientEvent::Connected | ClientEvent::Reconnected) => {
                    let tables = client.document().tables().len();
                    info!("Ready for commands ({} tables in document)", tables);
                }
                Ok(ClientEvent::ConnectionLost { attempt, max_attempts, delay }) => {
                    warn!("Connection lost, retry {}/{} in {:?}", attempt, max_attempts, delay);
                }
                Ok(ClientEvent::Superseded) => {
                    warn!("Another client took over the bridge, exiting");
                    break;
                }
                Ok(ClientEvent::GaveUp) => {
                    error!("Could not reach the bridge, exiting");
                    break;
                }
                Ok(ClientEvent::Disabled) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
        // Reconnect disabled and connection closed
        if !client.is_running() {
            info!("Client stopped");
            break;
        }
    }

    client.shutdown().await;
    shutdown_tracing();
    Ok(())
}
