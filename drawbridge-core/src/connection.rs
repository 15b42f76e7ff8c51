//! Transport connection abstraction
//!
//! A [`Connection`] is a write handle plus an ordered stream of
//! [`ConnectionEvent`]s. Both the bridge and the reconnecting client consume
//! connections this way, so neither deals with WebSocket callbacks directly.

use drawbridge_common::{BridgeError, Result, CLOSE_ABNORMAL};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const EVENT_BUFFER: usize = 256;

/// Close code reported when the peer sent a close frame without a status
const CLOSE_NO_STATUS: u16 = 1005;

/// Transport state, mirroring the WebSocket ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Message(String),
    /// Always the last event of a connection
    Closed { code: u16, reason: String },
    Error(String),
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close(u16, String),
}

/// Cloneable write side of a connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    state: Arc<AtomicU8>,
}

impl ConnectionHandle {
    /// Queue a text frame.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        if !self.is_open() {
            return Err(BridgeError::Connection("connection is not open".into()));
        }
        self.outbound
            .send(Outbound::Text(text.into()))
            .map_err(|_| BridgeError::Connection("connection writer stopped".into()))
    }

    /// Start the close handshake. No-op once closing.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let swapped = self.state.compare_exchange(
            ReadyState::Open as u8,
            ReadyState::Closing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if swapped.is_ok() {
            let _ = self.outbound.send(Outbound::Close(code, reason.into()));
        }
    }

    pub fn state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ReadyState::Open
    }
}

/// An established connection: write handle plus its event stream
#[derive(Debug)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub events: mpsc::Receiver<ConnectionEvent>,
}

impl Connection {
    /// Drive a handshaken WebSocket stream with a writer and a reader task.
    ///
    /// Transport pings are answered by tungstenite. A stream that ends
    /// without a close frame reports `Closed { 1006, "" }`.
    pub fn from_websocket<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut stream) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let state = Arc::new(AtomicU8::new(ReadyState::Open as u8));
        let reader_done = CancellationToken::new();

        let writer_done = reader_done.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    () = writer_done.cancelled() => break,
                    next = outbound_rx.recv() => next,
                };
                let message = match next {
                    Some(Outbound::Text(text)) => Message::text(text),
                    Some(Outbound::Close(code, reason)) => Message::Close(Some(CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    })),
                    // Every handle dropped
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                };
                if let Err(e) = sink.send(message).await {
                    debug!("WebSocket write failed: {}", e);
                    break;
                }
            }
        });

        let reader_state = state.clone();
        tokio::spawn(async move {
            let _ = event_tx.send(ConnectionEvent::Opened).await;
            let mut close: Option<(u16, String)> = None;

            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Text(text)) if close.is_none() => {
                        let _ = event_tx
                            .send(ConnectionEvent::Message(text.as_str().to_owned()))
                            .await;
                    }
                    Ok(Message::Close(frame)) if close.is_none() => {
                        let (code, reason) = frame.map_or_else(
                            || (CLOSE_NO_STATUS, String::new()),
                            |f| (u16::from(f.code), f.reason.as_str().to_owned()),
                        );
                        reader_state.store(ReadyState::Closed as u8, Ordering::Release);
                        // Report right away; keep polling so the close reply is flushed
                        let _ = event_tx
                            .send(ConnectionEvent::Closed {
                                code,
                                reason: reason.clone(),
                            })
                            .await;
                        close = Some((code, reason));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if close.is_none() {
                            let _ = event_tx.send(ConnectionEvent::Error(e.to_string())).await;
                        }
                        break;
                    }
                }
            }

            reader_state.store(ReadyState::Closed as u8, Ordering::Release);
            reader_done.cancel();
            if close.is_none() {
                let _ = event_tx
                    .send(ConnectionEvent::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: String::new(),
                    })
                    .await;
            }
        });

        Connection {
            handle: ConnectionHandle {
                outbound: outbound_tx,
                state,
            },
            events: event_rx,
        }
    }

    /// Wait for the next text message, skipping other events.
    ///
    /// Returns `None` once the connection closes.
    pub async fn next_message(&mut self) -> Option<String> {
        loop {
            match self.events.recv().await? {
                ConnectionEvent::Message(text) => return Some(text),
                ConnectionEvent::Closed { .. } => return None,
                ConnectionEvent::Opened | ConnectionEvent::Error(_) => {}
            }
        }
    }

    /// Wait for the close event, discarding anything before it.
    pub async fn closed(&mut self) -> Option<(u16, String)> {
        while let Some(event) = self.events.recv().await {
            if let ConnectionEvent::Closed { code, reason } = event {
                return Some((code, reason));
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Connection;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    /// Two ends of an in-memory WebSocket: (server side, client side).
    pub(crate) async fn connection_pair() -> (Connection, Connection) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let (server, client) = tokio::join!(
            WebSocketStream::from_raw_socket(server_io, Role::Server, None),
            WebSocketStream::from_raw_socket(client_io, Role::Client, None),
        );
        (
            Connection::from_websocket(server),
            Connection::from_websocket(client),
        )
    }
}
