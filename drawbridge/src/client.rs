//! Embeddable remote-control client with builder pattern.
//!
//! # Example
//!
//! ```rust,no_run
//! use drawbridge::core::DiagramDocument;
//! use drawbridge::Client;
//!
//! # async fn example() -> drawbridge::Result<()> {
//! let mut client = Client::builder()
//!     .origin("http://localhost:3000")
//!     .build()?;
//!
//! client.start().await?;
//! println!("Tables: {}", client.document().tables().len());
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use drawbridge_common::{BridgeError, Result};
use drawbridge_core::client::{ClientEvent, ClientState, DiagramDocument, MemoryDiagram};
use drawbridge_core::RemoteControl;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How often `start` re-checks a run task that stopped without connecting
const START_POLL: Duration = Duration::from_millis(50);

/// A remote-control client that executes bridge commands against a document.
///
/// Use [`Client::builder()`] to create a new client with the builder pattern.
#[derive(Debug)]
pub struct Client<D: DiagramDocument = MemoryDiagram> {
    config: ClientConfig,
    remote: RemoteControl<D>,
}

/// Builder for constructing a [`Client`] with ergonomic configuration.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl Client {
    /// Create a new client builder.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use drawbridge::Client;
    ///
    /// let client = Client::builder()
    ///     .url("ws://localhost:3000/remote-control")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<D: DiagramDocument> Client<D> {
    /// Enable remote control and wait for the first connection.
    ///
    /// With reconnection enabled an unreachable bridge is retried until the
    /// attempts run out.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is already running, another client
    /// superseded it, or every attempt failed.
    pub async fn start(&mut self) -> Result<()> {
        let mut state = self.remote.watch_state();
        self.remote.enable()?;

        loop {
            match *state.borrow_and_update() {
                ClientState::Connected => return Ok(()),
                ClientState::Superseded => {
                    return Err(BridgeError::Connection(
                        "superseded by another client".into(),
                    ))
                }
                ClientState::Failed => {
                    return Err(BridgeError::Connection(
                        "reconnect attempts exhausted".into(),
                    ))
                }
                ClientState::Disconnected if !self.remote.is_running() => {
                    return Err(BridgeError::Connection(
                        "Failed to establish connection".into(),
                    ))
                }
                _ => {}
            }
            let _ = tokio::time::timeout(START_POLL, state.changed()).await;
        }
    }

    /// Disable remote control and wait for cleanup.
    pub async fn shutdown(&mut self) {
        self.remote.disable().await;
    }

    /// Check if the client is currently connecting, connected or backing off.
    pub fn is_running(&self) -> bool {
        self.remote.is_running()
    }

    pub fn is_connected(&self) -> bool {
        self.remote.is_connected()
    }

    pub fn state(&self) -> ClientState {
        self.remote.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.remote.subscribe()
    }

    pub fn document(&self) -> &Arc<D> {
        self.remote.document()
    }

    /// The underlying remote control, for direct enable/disable.
    pub fn remote(&mut self) -> &mut RemoteControl<D> {
        &mut self.remote
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl ClientBuilder {
    /// Set the bridge URL explicitly (`ws://` or `wss://`).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Derive the bridge URL from the page origin (`http://host:port`).
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.config.origin = Some(origin.into());
        self
    }

    /// Set the path appended to the origin.
    ///
    /// Default: `/remote-control`
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Enable or disable automatic reconnection.
    ///
    /// Default: `true`
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.reconnect.enabled = enabled;
        self
    }

    /// Replace the whole reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, config: drawbridge_common::ReconnectConfig) -> Self {
        self.config.reconnect = config;
        self
    }

    /// Set the reconnect attempt limit.
    ///
    /// Default: 10
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.reconnect.max_attempts = attempts;
        self
    }

    /// Set the interval between heartbeat pings.
    ///
    /// Default: 30 seconds
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat.interval = interval;
        self
    }

    /// Build a client over a fresh in-memory document.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `url` nor `origin` is set, or a value is
    /// invalid.
    pub fn build(self) -> Result<Client<MemoryDiagram>> {
        self.build_with(Arc::new(MemoryDiagram::new()))
    }

    /// Build a client over the given document.
    pub fn build_with<D: DiagramDocument>(self, document: Arc<D>) -> Result<Client<D>> {
        self.config.validate()?;
        let remote = RemoteControl::new(self.config.to_options()?, document)?;
        Ok(Client {
            config: self.config,
            remote,
        })
    }
}
