//! Core of `Drawbridge`: the command bridge, the WebSocket gateway feeding it
//! and the reconnecting client that executes commands against a document.

pub mod bridge;
pub mod client;
pub mod connection;
pub mod gateway;

pub use bridge::CommandBridge;
pub use client::{
    resolve_url, ClientEvent, ClientOptions, ClientState, DiagramDocument, DocumentError,
    MemoryDiagram, RemoteControl,
};
pub use connection::{Connection, ConnectionEvent, ConnectionHandle, ReadyState};
pub use gateway::Gateway;
