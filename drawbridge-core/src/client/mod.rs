//! Reconnecting remote-control client
//!
//! Runs inside the document-owning process: connects to the bridge, answers
//! every command frame through a [`Dispatcher`], pings on a fixed interval and
//! reconnects with exponential backoff unless another client superseded it.

pub mod dispatch;
pub mod document;
pub mod memory;
pub mod reconnect;

pub use dispatch::Dispatcher;
pub use document::{DiagramDocument, DocumentError, DocumentResult};
pub use memory::{HistoryEntry, MemoryDiagram};
pub use reconnect::{Backoff, CloseDecision, ReconnectPolicy, ReconnectState};

use crate::connection::{Connection, ConnectionEvent};
use drawbridge_common::{
    BridgeError, HeartbeatConfig, ReconnectConfig, Result, CLOSE_ABNORMAL, CLOSE_NORMAL,
};
use drawbridge_protocol::{Frame, FrameCodec};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 32;

/// Close reason sent when the owner turns remote control off
const DISABLED_CLOSE_REASON: &str = "Remote control disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the backoff delay
    Reconnecting,
    /// Another client took over the bridge; terminal
    Superseded,
    /// Reconnect attempts exhausted; terminal
    Failed,
}

/// Notifications for observers of a [`RemoteControl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    Reconnected,
    ConnectionLost {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    Superseded,
    GaveUp,
    Disabled,
}

/// Work out the bridge URL: an explicit override wins, otherwise the
/// document's origin is mapped to the WebSocket scheme and `path` appended.
pub fn resolve_url(url: Option<&str>, origin: Option<&str>, path: &str) -> Result<String> {
    if let Some(url) = url.filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }

    let origin = origin
        .filter(|o| !o.is_empty())
        .ok_or_else(|| BridgeError::Config("either url or origin must be set".into()))?
        .trim_end_matches('/');

    let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if origin.starts_with("ws://") || origin.starts_with("wss://") {
        origin.to_string()
    } else {
        return Err(BridgeError::Config(format!(
            "unsupported origin scheme: {origin}"
        )));
    };

    if path.starts_with('/') {
        Ok(format!("{ws_origin}{path}"))
    } else {
        Ok(format!("{ws_origin}/{path}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Resolved `ws://` or `wss://` URL of the bridge
    pub url: String,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(BridgeError::Config(format!(
                "url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.heartbeat.interval.is_zero() {
            return Err(BridgeError::Config(
                "heartbeat interval must be non-zero".into(),
            ));
        }
        self.reconnect.validate()
    }
}

/// Remote-control client bound to one document.
///
/// Nothing happens until [`enable`](Self::enable); [`disable`](Self::disable)
/// tears the connection down and stops every timer.
pub struct RemoteControl<D: DiagramDocument> {
    options: ClientOptions,
    dispatcher: Dispatcher<D>,
    state: Arc<watch::Sender<ClientState>>,
    events: broadcast::Sender<ClientEvent>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl<D: DiagramDocument> std::fmt::Debug for RemoteControl<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControl")
            .field("url", &self.options.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<D: DiagramDocument> RemoteControl<D> {
    pub fn new(options: ClientOptions, document: Arc<D>) -> Result<Self> {
        options.validate()?;
        let (state, _) = watch::channel(ClientState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            options,
            dispatcher: Dispatcher::new(document),
            state: Arc::new(state),
            events,
            cancel: None,
            task: None,
        })
    }

    /// Start connecting. A client that reached a terminal state may be
    /// enabled again.
    pub fn enable(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(BridgeError::InvalidState(
                "remote control already enabled".into(),
            ));
        }

        let cancel = CancellationToken::new();
        let runner = Runner {
            url: self.options.url.clone(),
            heartbeat: self.options.heartbeat.interval,
            dispatcher: self.dispatcher.clone(),
            codec: FrameCodec::new(),
            state: self.state.clone(),
            events: self.events.clone(),
            cancel: cancel.clone(),
            policy: ReconnectPolicy::new(self.options.reconnect.clone()),
        };
        info!("Remote control enabled for {}", self.options.url);
        self.state.send_replace(ClientState::Connecting);
        self.cancel = Some(cancel);
        self.task = Some(tokio::spawn(runner.run()));
        Ok(())
    }

    /// Close the socket, cancel pending reconnects and heartbeats, and wait
    /// for the run task to finish.
    pub async fn disable(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.state.send_replace(ClientState::Disconnected);
        let _ = self.events.send(ClientEvent::Disabled);
        info!("Remote control disabled");
    }

    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ClientState::Connected
    }

    /// True while the run task is alive (connecting, connected or backing off)
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn document(&self) -> &Arc<D> {
        self.dispatcher.document()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl<D: DiagramDocument> Drop for RemoteControl<D> {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// State owned by the spawned run task
struct Runner<D> {
    url: String,
    heartbeat: Duration,
    dispatcher: Dispatcher<D>,
    codec: FrameCodec,
    state: Arc<watch::Sender<ClientState>>,
    events: broadcast::Sender<ClientEvent>,
    cancel: CancellationToken,
    policy: ReconnectPolicy,
}

impl<D: DiagramDocument> Runner<D> {
    fn set_state(&self, state: ClientState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn run(mut self) {
        loop {
            self.set_state(ClientState::Connecting);
            debug!("Connecting to {}", self.url);

            let connected = tokio::select! {
                () = self.cancel.cancelled() => return,
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
            };

            let (code, reason) = match connected {
                Ok((ws, _response)) => {
                    let mut connection = Connection::from_websocket(ws);
                    let reconnected = self.policy.on_connected();
                    self.set_state(ClientState::Connected);
                    if reconnected {
                        info!("Reconnected to {}", self.url);
                        self.emit(ClientEvent::Reconnected);
                    } else {
                        info!("Connected to {}", self.url);
                        self.emit(ClientEvent::Connected);
                    }

                    match self.run_session(&mut connection).await {
                        Some(close) => close,
                        None => {
                            connection.handle.close(CLOSE_NORMAL, DISABLED_CLOSE_REASON);
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to connect to {}: {}", self.url, e);
                    (CLOSE_ABNORMAL, String::new())
                }
            };

            match self.policy.on_closed(code, &reason) {
                CloseDecision::Reconnect { attempt, delay } => {
                    let max_attempts = self.policy.max_attempts();
                    info!(
                        "Connection lost (code {}), reconnecting in {:?} (attempt {}/{})",
                        code, delay, attempt, max_attempts
                    );
                    self.set_state(ClientState::Reconnecting);
                    self.emit(ClientEvent::ConnectionLost {
                        attempt,
                        max_attempts,
                        delay,
                    });
                    tokio::select! {
                        () = self.cancel.cancelled() => return,
                        () = tokio::time::sleep(delay) => {}
                    }
                    self.policy.start_reconnect();
                }
                CloseDecision::Superseded => {
                    warn!("Another client took over the bridge; not reconnecting");
                    self.set_state(ClientState::Superseded);
                    self.emit(ClientEvent::Superseded);
                    return;
                }
                CloseDecision::GiveUp => {
                    error!(
                        "Giving up after {} reconnect attempts",
                        self.policy.max_attempts()
                    );
                    self.set_state(ClientState::Failed);
                    self.emit(ClientEvent::GaveUp);
                    return;
                }
                CloseDecision::Stop => {
                    info!("Connection closed (code {}); reconnect disabled", code);
                    self.set_state(ClientState::Disconnected);
                    return;
                }
            }
        }
    }

    /// Serve one connection. Returns the close code and reason, or `None`
    /// when cancelled.
    async fn run_session(&self, connection: &mut Connection) -> Option<(u16, String)> {
        let start = Instant::now() + self.heartbeat;
        let mut heartbeat = tokio::time::interval_at(start, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return None,
                _ = heartbeat.tick() => {
                    match self.codec.encode(&Frame::ping()) {
                        Ok(ping) => {
                            debug!("Sending heartbeat ping");
                            if let Err(e) = connection.handle.send_text(ping) {
                                debug!("Heartbeat not sent: {}", e);
                            }
                        }
                        Err(e) => error!("Failed to encode ping: {}", e),
                    }
                }
                event = connection.events.recv() => match event {
                    Some(ConnectionEvent::Message(text)) => {
                        if let Some(reply) = self.dispatcher.handle_text(&text) {
                            if let Err(e) = connection.handle.send_text(reply) {
                                warn!("Failed to send response: {}", e);
                            }
                        }
                    }
                    Some(ConnectionEvent::Closed { code, reason }) => {
                        debug!("Connection closed: {} {}", code, reason);
                        return Some((code, reason));
                    }
                    Some(ConnectionEvent::Error(e)) => warn!("Connection error: {}", e),
                    Some(ConnectionEvent::Opened) => {}
                    None => return Some((CLOSE_ABNORMAL, String::new())),
                },
            }
        }
    }
}
