//! Configuration types for the `Drawbridge` client and server.
//!
//! These types provide type-safe configuration for embedding `Drawbridge`
//! in your applications.

use drawbridge_common::{
    BridgeConfig, BridgeError, HeartbeatConfig, ReconnectConfig, Result, DEFAULT_PORT,
    DEFAULT_REMOTE_CONTROL_PATH,
};
use drawbridge_core::client::{resolve_url, ClientOptions};
use std::net::SocketAddr;

/// Configuration for the remote-control client.
///
/// Use [`ClientBuilder`](crate::ClientBuilder) for ergonomic construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Explicit bridge URL; wins over `origin`
    pub url: Option<String>,

    /// Origin of the page hosting the document (`http://host:port`)
    pub origin: Option<String>,

    /// Path appended to `origin`
    pub path: String,

    pub reconnect: ReconnectConfig,

    pub heartbeat: HeartbeatConfig,
}

impl ClientConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() && self.origin.is_none() {
            return Err(BridgeError::Config("url or origin is required".into()));
        }
        if self.path.is_empty() {
            return Err(BridgeError::Config("path is required".into()));
        }
        self.to_options()?.validate()
    }

    /// Resolve into the options the client runs with.
    pub fn to_options(&self) -> Result<ClientOptions> {
        let url = resolve_url(self.url.as_deref(), self.origin.as_deref(), &self.path)?;
        Ok(ClientOptions {
            url,
            reconnect: self.reconnect.clone(),
            heartbeat: self.heartbeat.clone(),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: None,
            origin: None,
            path: DEFAULT_REMOTE_CONTROL_PATH.to_string(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Configuration for the bridge server.
///
/// Use [`ServerBuilder`](crate::ServerBuilder) for ergonomic construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the gateway listens on
    pub bind_addr: SocketAddr,

    /// Path remote-control connections must request
    pub path: String,

    pub bridge: BridgeConfig,
}

impl ServerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(BridgeError::Config(format!(
                "path must start with '/', got {:?}",
                self.path
            )));
        }
        self.bridge.validate()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], DEFAULT_PORT).into(),
            path: DEFAULT_REMOTE_CONTROL_PATH.to_string(),
            bridge: BridgeConfig::default(),
        }
    }
}
