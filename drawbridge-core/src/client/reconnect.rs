//! Exponential backoff reconnection logic

use drawbridge_common::{ReconnectConfig, CLOSE_NORMAL, REPLACED_CLOSE_REASON};
use rand::Rng;
use std::time::Duration;

/// Exponential backoff calculator
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_jitter: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration, max_jitter: Duration) -> Self {
        Self {
            base,
            max,
            max_jitter,
        }
    }

    /// Delay before attempt `attempt` (1-based), without jitter:
    /// `min(base * 2^(attempt-1), max)`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay before attempt `attempt` with random jitter in `0..max_jitter`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// What to do after the connection closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Schedule attempt `attempt` after `delay`
    Reconnect { attempt: u32, delay: Duration },
    /// Another client took over; stop for good
    Superseded,
    /// Attempts exhausted; stop for good
    GiveUp,
    /// Automatic reconnection is turned off
    Stop,
}

/// Reconnection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Connecting,
    Connected,
    /// Waiting before the next attempt
    Backoff,
    Superseded,
    /// Permanently failed (attempts exhausted)
    Failed,
}

/// Reconnect state machine, independent of any transport
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    backoff: Backoff,
    attempts: u32,
    state: ReconnectState,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let backoff = Backoff::new(config.base_delay, config.max_delay, config.max_jitter);
        Self {
            config,
            backoff,
            attempts: 0,
            state: ReconnectState::Connecting,
        }
    }

    /// True when a close with this code and reason means another client
    /// replaced this one.
    pub fn is_supersession(code: u16, reason: &str) -> bool {
        code == CLOSE_NORMAL && reason == REPLACED_CLOSE_REASON
    }

    /// Mark connection as successful.
    ///
    /// Returns `true` when this was a reconnect (attempts were pending).
    pub fn on_connected(&mut self) -> bool {
        let was_reconnecting = self.attempts > 0;
        self.attempts = 0;
        self.state = ReconnectState::Connected;
        was_reconnecting
    }

    /// Handle a closed (or failed) connection.
    pub fn on_closed(&mut self, code: u16, reason: &str) -> CloseDecision {
        match self.state {
            ReconnectState::Superseded => return CloseDecision::Superseded,
            ReconnectState::Failed => return CloseDecision::GiveUp,
            _ => {}
        }

        if Self::is_supersession(code, reason) {
            self.state = ReconnectState::Superseded;
            return CloseDecision::Superseded;
        }
        if !self.config.enabled {
            return CloseDecision::Stop;
        }
        if self.attempts >= self.config.max_attempts {
            self.state = ReconnectState::Failed;
            return CloseDecision::GiveUp;
        }

        self.attempts += 1;
        self.state = ReconnectState::Backoff;
        CloseDecision::Reconnect {
            attempt: self.attempts,
            delay: self.backoff.delay(self.attempts),
        }
    }

    /// Mark as reconnecting (after backoff wait)
    pub fn start_reconnect(&mut self) {
        if self.state == ReconnectState::Backoff {
            self.state = ReconnectState::Connecting;
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    #[must_use]
    pub fn state(&self) -> ReconnectState {
        self.state
    }

    /// Check if should continue trying
    #[must_use]
    pub fn should_retry(&self) -> bool {
        !matches!(
            self.state,
            ReconnectState::Failed | ReconnectState::Superseded
        )
    }
}
