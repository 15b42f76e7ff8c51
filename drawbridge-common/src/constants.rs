//! Default endpoints, timings and close codes shared by the bridge and client.
//!
//! Use these constants instead of magic numbers so the server, the client and
//! the CLI agree on the wire-level details.

use std::time::Duration;

/// Path the gateway accepts remote-control connections on.
pub const DEFAULT_REMOTE_CONTROL_PATH: &str = "/remote-control";

/// Default port for the bridge server.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address for the bridge server as a string (`127.0.0.1:3000`).
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Abnormal closure (no close frame received).
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Server is overloaded or busy; the peer may retry later.
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// Close reason sent to a connection that another session has taken over.
///
/// Clients seeing this reason together with [`CLOSE_NORMAL`] must not reconnect.
pub const REPLACED_CLOSE_REASON: &str = "Replaced by new connection";

/// Close reason sent to a newcomer when the attach lock could not be acquired.
pub const ATTACH_CONTENTION_REASON: &str = "Attach contention";

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default heartbeat interval on the client side.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum text frame size (16MB).
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
