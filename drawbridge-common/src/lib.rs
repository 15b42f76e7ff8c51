//! Common utilities and types for `Drawbridge`

pub mod config;
pub mod constants;
pub mod error;

pub use config::{BridgeConfig, HeartbeatConfig, ReconnectConfig};
pub use constants::{
    CLOSE_ABNORMAL, CLOSE_NORMAL, CLOSE_TRY_AGAIN_LATER, DEFAULT_BIND, DEFAULT_PORT,
    DEFAULT_REMOTE_CONTROL_PATH, REPLACED_CLOSE_REASON,
};
pub use error::{BridgeError, Result};
