//! # `Drawbridge`
//!
//! A remote-control bridge between a tool layer and a diagram editor.
//!
//! ## Overview
//!
//! The editor (or any process owning a diagram document) connects to the
//! bridge over a WebSocket. The tool layer issues typed commands through the
//! [`CommandBridge`]; each command is correlated with its response by id,
//! bounded by a deadline, and rejected when the editor disconnects. Only one
//! editor is attached at a time: a newcomer replaces the previous connection,
//! which then stops reconnecting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drawbridge::prelude::*;
//!
//! # async fn example() -> drawbridge::Result<()> {
//! let mut server = Server::builder().build()?;
//! server.start().await?;
//!
//! let diagram = RemoteDiagram::new(server.bridge().clone());
//! let tables = diagram.get_tables().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`drawbridge-common`] - errors, configuration and constants
//! - [`drawbridge-protocol`] - wire frames, codec, typed commands and the diagram model
//! - [`drawbridge-core`] - command bridge, gateway and reconnecting client

pub mod client;
pub mod config;
pub mod remote;
pub mod server;

pub use drawbridge_common as common;
pub use drawbridge_core as core;
pub use drawbridge_protocol as protocol;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ServerConfig};
pub use remote::RemoteDiagram;
pub use server::{Server, ServerBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::{BridgeError, Result};
    pub use crate::core::client::{ClientEvent, ClientState, DiagramDocument, MemoryDiagram};
    pub use crate::core::CommandBridge;
    pub use crate::protocol::{Command, Diagram, Table};
    pub use crate::{Client, RemoteDiagram, Server};
}

// Convenience re-exports at crate root
pub use common::{BridgeError, Result};
pub use drawbridge_core::CommandBridge;
