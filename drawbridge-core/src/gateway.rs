//! WebSocket gateway feeding the command bridge
//!
//! Accepts TCP connections, upgrades those requesting the remote-control path
//! and hands each upgraded connection to [`CommandBridge::attach`].

use crate::bridge::CommandBridge;
use crate::connection::Connection;
use drawbridge_common::Result;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

pub struct Gateway {
    listener: TcpListener,
    path: String,
    bridge: CommandBridge,
}

impl Gateway {
    /// Bind the listener. Use port 0 to pick a free port.
    pub async fn bind(
        addr: SocketAddr,
        path: impl Into<String>,
        bridge: CommandBridge,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            path: path.into(),
            bridge,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Accept connections until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = self.local_addr()?;
        info!("Remote-control gateway listening on ws://{}{}", addr, self.path);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Gateway shutting down");
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let path = self.path.clone();
                        let bridge = self.bridge.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, path, bridge).await;
                        });
                    }
                    Err(e) => error!("Accept error: {}", e),
                },
            }
        }
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    path: String,
    bridge: CommandBridge,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
    }

    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, check_path).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    info!("Remote-control connection from {}", peer);
    if let Err(e) = bridge.attach(Connection::from_websocket(ws)).await {
        warn!("Failed to attach connection from {}: {}", peer, e);
    }
}
