//! Command bridge
//!
//! The bridge owns the single connection slot and the pending request table.
//! Tool-side callers issue commands with [`CommandBridge::send_command`]; the
//! remote-control client answers them over whichever connection is attached.

pub mod pending;

use crate::connection::{Connection, ConnectionEvent, ConnectionHandle};
use drawbridge_common::constants::ATTACH_CONTENTION_REASON;
use drawbridge_common::{
    BridgeConfig, BridgeError, Result, CLOSE_ABNORMAL, CLOSE_NORMAL, CLOSE_TRY_AGAIN_LATER,
    REPLACED_CLOSE_REASON,
};
use drawbridge_protocol::{Command, CommandFrame, Frame, FrameCodec, Heartbeat};
use pending::PendingTable;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Close reason sent when the bridge itself shuts down
const SHUTDOWN_CLOSE_REASON: &str = "Bridge shutting down";

struct ActiveConnection {
    generation: u64,
    handle: ConnectionHandle,
    reader: AbortHandle,
}

struct Inner {
    config: BridgeConfig,
    codec: FrameCodec,
    id_prefix: String,
    next_id: AtomicU64,
    next_generation: AtomicU64,
    slot: Mutex<Option<ActiveConnection>>,
    pending: PendingTable,
    attach_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_generation(&self) -> Option<u64> {
        self.slot().as_ref().map(|active| active.generation)
    }
}

/// Handle to one bridge instance. Clones share the same slot and table.
#[derive(Clone)]
pub struct CommandBridge {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CommandBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBridge")
            .field("id_prefix", &self.inner.id_prefix)
            .field("connected", &self.is_connected())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Default for CommandBridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl CommandBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let codec = FrameCodec::with_max_frame_size(config.max_frame_bytes);
        let id_prefix = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            inner: Arc::new(Inner {
                config,
                codec,
                id_prefix,
                next_id: AtomicU64::new(1),
                next_generation: AtomicU64::new(1),
                slot: Mutex::new(None),
                pending: PendingTable::new(),
                attach_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// True iff a connection is attached and its transport is open.
    pub fn is_connected(&self) -> bool {
        self.inner
            .slot()
            .as_ref()
            .is_some_and(|active| active.handle.is_open())
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Install `connection` as the active connection.
    ///
    /// Attaches are serialised. A previous connection is detached, its pending
    /// requests are rejected with `ClientDisconnected`, and it is closed with
    /// code 1000 and the replacement reason before the newcomer is installed.
    /// If the attach lock cannot be taken within `attach_wait`, the newcomer is
    /// closed with 1013 and [`BridgeError::AttachTimeout`] is returned.
    pub async fn attach(&self, connection: Connection) -> Result<()> {
        let Connection { handle, events } = connection;
        let wait = self.inner.config.attach_wait;

        let Ok(_guard) = tokio::time::timeout(wait, self.inner.attach_lock.lock()).await else {
            warn!("Attach lock not acquired within {:?}, rejecting connection", wait);
            #[cfg(feature = "metrics")]
            if let Some(m) = drawbridge_observability::bridge_metrics() {
                m.record_attach_contention();
            }
            handle.close(CLOSE_TRY_AGAIN_LATER, ATTACH_CONTENTION_REASON);
            return Err(BridgeError::AttachTimeout(wait));
        };

        let previous = self.inner.slot().take();
        if let Some(old) = previous {
            // Detach first so the old connection cannot deliver further frames
            old.reader.abort();
            let rejected = self.inner.pending.reject_generation(old.generation);
            if old.handle.is_open() {
                info!(
                    generation = old.generation,
                    rejected, "Replacing remote-control connection"
                );
                old.handle.close(CLOSE_NORMAL, REPLACED_CLOSE_REASON);
                #[cfg(feature = "metrics")]
                if let Some(m) = drawbridge_observability::bridge_metrics() {
                    m.record_replaced();
                }
                tokio::time::sleep(self.inner.config.replace_grace).await;
            }
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        {
            // Hold the slot while spawning so an immediate close sees this generation
            let mut slot = self.inner.slot();
            let reader = tokio::spawn(read_loop(
                self.inner.clone(),
                generation,
                handle.clone(),
                events,
            ));
            *slot = Some(ActiveConnection {
                generation,
                handle,
                reader: reader.abort_handle(),
            });
        }

        #[cfg(feature = "metrics")]
        if let Some(m) = drawbridge_observability::bridge_metrics() {
            m.record_attached();
        }
        info!(generation, "Remote-control client attached");
        Ok(())
    }

    /// Send a typed command and wait for its response data.
    pub async fn send_command(&self, command: Command) -> Result<Value> {
        // Fail before allocating an id when nobody is listening
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        let frame = command.into_frame(self.next_request_id())?;
        self.send_frame(frame).await
    }

    /// Send a command by name with untyped params.
    pub async fn send_raw(&self, command: impl Into<String>, params: Value) -> Result<Value> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        let frame = CommandFrame {
            id: self.next_request_id(),
            command: command.into(),
            params,
        };
        self.send_frame(frame).await
    }

    #[instrument(
        name = "command",
        level = "debug",
        skip_all,
        fields(id = %frame.id, command = %frame.command)
    )]
    async fn send_frame(&self, frame: CommandFrame) -> Result<Value> {
        let (handle, generation) = {
            let slot = self.inner.slot();
            match slot.as_ref() {
                Some(active) if active.handle.is_open() => {
                    (active.handle.clone(), active.generation)
                }
                _ => return Err(BridgeError::NotConnected),
            }
        };

        let id = frame.id.clone();
        let command = frame.command.clone();
        let text = self.inner.codec.encode(&Frame::Command(frame))?;
        let pending = &self.inner.pending;
        let mut completion = pending.register(&id, command.as_str(), generation)?;
        let guard = PendingGuard { pending, id: &id };

        // An attach may have swapped the slot between the read above and the
        // registration; that generation's requests are already rejected.
        if self.inner.current_generation() != Some(generation) {
            return Err(BridgeError::ClientDisconnected);
        }

        handle.send_text(text)?;
        debug!(%id, %command, "Command sent");

        let timeout = self.inner.config.request_timeout;
        let result = match tokio::time::timeout(timeout, &mut completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::ClientDisconnected),
            Err(_) => {
                if pending.expire(&id).is_some() {
                    warn!(%id, %command, "Command timed out after {:?}", timeout);
                    Err(BridgeError::Timeout {
                        command: command.clone(),
                        after: timeout,
                    })
                } else {
                    // Completed concurrently with the deadline
                    completion
                        .try_recv()
                        .unwrap_or(Err(BridgeError::ClientDisconnected))
                }
            }
        };
        drop(guard);

        match &result {
            Ok(_) => debug!(%id, %command, "Command completed"),
            Err(e) => warn!(%id, %command, "Command failed: {}", e),
        }
        result
    }

    /// Close the active connection and reject everything outstanding.
    pub async fn close(&self) {
        let _guard = self.inner.attach_lock.lock().await;
        let previous = self.inner.slot().take();
        if let Some(active) = previous {
            active.reader.abort();
            active.handle.close(CLOSE_NORMAL, SHUTDOWN_CLOSE_REASON);
            info!(generation = active.generation, "Remote-control connection closed");
        }
        let rejected = self.inner.pending.reject_all();
        if rejected > 0 {
            info!(rejected, "Rejected outstanding commands on shutdown");
        }
    }

    fn next_request_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("cmd_{}_{}", self.inner.id_prefix, n)
    }
}

/// Removes the request if the caller's future is dropped before completion.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.id);
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    generation: u64,
    handle: ConnectionHandle,
    mut events: mpsc::Receiver<ConnectionEvent>,
) {
    let mut close = (CLOSE_ABNORMAL, String::new());
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Opened => debug!(generation, "Connection opened"),
            ConnectionEvent::Message(text) => handle_text(&inner, &handle, &text),
            ConnectionEvent::Error(e) => warn!(generation, "Connection error: {}", e),
            ConnectionEvent::Closed { code, reason } => {
                close = (code, reason);
                break;
            }
        }
    }
    on_closed(&inner, generation, close.0, &close.1);
}

fn handle_text(inner: &Inner, handle: &ConnectionHandle, text: &str) {
    match inner.codec.decode(text) {
        Ok(Frame::Heartbeat(Heartbeat::Ping)) => {
            debug!("Ping received");
            let reply = inner.codec.encode(&Frame::pong());
            if let Err(e) = reply.and_then(|pong| handle.send_text(pong)) {
                warn!("Failed to answer ping: {}", e);
            }
        }
        Ok(Frame::Heartbeat(Heartbeat::Pong)) => debug!("Pong received"),
        Ok(Frame::Response(response)) => {
            let id = response.id.clone();
            if !inner.pending.resolve(response) {
                warn!(%id, "Response for unknown or already completed command");
                #[cfg(feature = "metrics")]
                if let Some(m) = drawbridge_observability::bridge_metrics() {
                    m.record_unmatched();
                }
            }
        }
        Ok(Frame::Command(frame)) => {
            warn!(id = %frame.id, command = %frame.command, "Ignoring command frame sent to the bridge");
        }
        Err(e) => warn!("Ignoring malformed frame: {}", e),
    }
}

fn on_closed(inner: &Inner, generation: u64, code: u16, reason: &str) {
    {
        let mut slot = inner.slot();
        if slot.as_ref().is_some_and(|a| a.generation == generation) {
            *slot = None;
        }
    }
    let rejected = inner.pending.reject_generation(generation);
    info!(
        generation,
        code, reason, rejected, "Remote-control client disconnected"
    );
}

#[cfg(test)]
mod tests;
