//! Configuration types for the bridge server and the reconnecting client

use crate::constants::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_REQUEST_TIMEOUT, MAX_FRAME_BYTES};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Command bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Deadline for each outstanding command
    pub request_timeout: Duration,
    /// Pause after closing a replaced connection so the close can propagate
    pub replace_grace: Duration,
    /// Bounded wait for the attach lock
    pub attach_wait: Duration,
    /// Maximum text frame size in bytes
    pub max_frame_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            replace_grace: Duration::from_millis(50),
            attach_wait: Duration::from_secs(2),
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(BridgeError::Config("request_timeout must be non-zero".into()));
        }
        if self.attach_wait.is_zero() {
            return Err(BridgeError::Config("attach_wait must be non-zero".into()));
        }
        if self.max_frame_bytes == 0 {
            return Err(BridgeError::Config("max_frame_bytes must be non-zero".into()));
        }
        Ok(())
    }
}

/// Reconnection policy for the remote-control client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect automatically after an unplanned close
    pub enabled: bool,
    /// Delay before the first reconnect attempt
    pub base_delay: Duration,
    /// Upper bound for the exponential part of the delay
    pub max_delay: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Upper bound of the random jitter added to each delay
    pub max_jitter: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl ReconnectConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_delay > self.max_delay {
            return Err(BridgeError::Config(
                "base_delay must not exceed max_delay".into(),
            ));
        }
        Ok(())
    }
}

/// Client heartbeat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between pings while connected
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bridge = BridgeConfig::default();
        assert_eq!(bridge.request_timeout, Duration::from_secs(30));
        assert_eq!(bridge.replace_grace, Duration::from_millis(50));
        assert!(bridge.validate().is_ok());

        let reconnect = ReconnectConfig::default();
        assert_eq!(reconnect.max_attempts, 10);
        assert_eq!(reconnect.max_delay, Duration::from_secs(30));
        assert!(reconnect.validate().is_ok());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let config = BridgeConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }

    #[test]
    fn test_inverted_backoff_bounds_rejected() {
        let config = ReconnectConfig {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
