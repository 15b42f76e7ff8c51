//! Embeddable bridge server with builder pattern.
//!
//! # Example
//!
//! ```rust,no_run
//! use drawbridge::Server;
//! use drawbridge::protocol::Command;
//!
//! # async fn example() -> drawbridge::Result<()> {
//! let mut server = Server::builder()
//!     .bind("127.0.0.1:3000".parse().unwrap())
//!     .path("/remote-control")
//!     .build()?;
//!
//! server.start().await?;
//! let diagram = server.bridge().send_command(Command::GetDiagram {}).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ServerConfig;
use drawbridge_common::{BridgeError, Result};
use drawbridge_core::{CommandBridge, Gateway};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A bridge server that can be embedded in your application.
///
/// Use [`Server::builder()`] to create a new server with the builder pattern.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    bridge: CommandBridge,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<Result<()>>>,
}

/// Builder for constructing a [`Server`] with ergonomic configuration.
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfig,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Bind the gateway and start accepting remote-control connections in the
    /// background.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is already running or binding fails.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.task.is_some() {
            return Err(BridgeError::InvalidState("server already started".into()));
        }

        let gateway = Gateway::bind(
            self.config.bind_addr,
            self.config.path.clone(),
            self.bridge.clone(),
        )
        .await?;
        let addr = gateway.local_addr()?;

        info!("Starting `Drawbridge` server");
        info!("  Gateway: ws://{}{}", addr, self.config.path);
        info!("  Request timeout: {:?}", self.config.bridge.request_timeout);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(addr);
        self.task = Some(tokio::spawn(async move {
            let result = gateway.run(shutdown_rx).await;
            if let Err(e) = &result {
                error!("Gateway stopped: {}", e);
            }
            result
        }));

        Ok(addr)
    }

    /// Stop accepting connections, close the attached client and fail every
    /// outstanding command.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stop();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(e) => {
                    return Err(BridgeError::InvalidState(format!(
                        "gateway task panicked: {e}"
                    )))
                }
            }
        }
        self.bridge.close().await;
        Ok(())
    }

    /// Signal the gateway to stop (non-blocking).
    ///
    /// Use [`shutdown()`](Self::shutdown) if you need to wait for cleanup.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }

    /// Check if the gateway is currently accepting connections.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// The command bridge. Clone it to issue commands from other tasks.
    pub fn bridge(&self) -> &CommandBridge {
        &self.bridge
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // Best-effort signal shutdown on drop
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

impl ServerBuilder {
    /// Set the address the gateway listens on.
    ///
    /// Default: `127.0.0.1:3000`
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the path remote-control clients connect to.
    ///
    /// Default: `/remote-control`
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the per-command deadline.
    ///
    /// Default: 30 seconds
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.bridge.request_timeout = timeout;
        self
    }

    /// Set the bounded wait for concurrent connection attaches.
    ///
    /// Default: 2 seconds
    #[must_use]
    pub fn attach_wait(mut self, wait: Duration) -> Self {
        self.config.bridge.attach_wait = wait;
        self
    }

    /// Build the server with the configured options.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or a timeout is zero.
    pub fn build(self) -> Result<Server> {
        self.config.validate()?;
        Ok(Server {
            bridge: CommandBridge::new(self.config.bridge.clone()),
            config: self.config,
            local_addr: None,
            shutdown_tx: None,
            task: None,
        })
    }
}
