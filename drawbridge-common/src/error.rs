//! Error types for `Drawbridge`

use std::time::Duration;
use thiserror::Error;

/// Main error type for `Drawbridge` operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No client is attached to the bridge
    #[error("DrawDB client is not connected. Make sure the frontend is running with remote control enabled")]
    NotConnected,

    /// No response arrived before the request deadline
    #[error("Command {command} timed out after {}ms", after.as_millis())]
    Timeout { command: String, after: Duration },

    /// The connection dropped while the request was outstanding
    #[error("DrawDB client disconnected")]
    ClientDisconnected,

    /// The client executed the command and reported a failure
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Command name not present in the dispatch table
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Frame could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Response referenced an id with no pending request
    #[error("Received response for unknown request: {0}")]
    UnmatchedResponse(String),

    /// Attach lock could not be acquired within the bounded wait
    #[error("Connection setup still in progress after {}ms", .0.as_millis())]
    AttachTimeout(Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Connection error
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::UnknownCommand("explode".to_string());
        assert_eq!(err.to_string(), "Unknown command: explode");
    }

    #[test]
    fn test_timeout_display_uses_millis() {
        let err = BridgeError::Timeout {
            command: "getDiagram".into(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Command getDiagram timed out after 30000ms");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::other("test");
        let err: BridgeError = io_err.into();
        assert!(matches!(err, BridgeError::Io(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::Serialization(_)));
    }
}
