#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for `Drawbridge`
//!
//! These tests run a real gateway on a free port and talk to it with the
//! remote-control client or a bare WebSocket.

mod bridge_test;
mod reconnect_test;

use drawbridge::common::ReconnectConfig;
use drawbridge::core::client::MemoryDiagram;
use drawbridge::{Client, Server};
use std::time::Duration;

/// Start a server on an ephemeral port with a short request timeout.
pub async fn start_server(request_timeout: Duration) -> Server {
    let mut server = Server::builder()
        .bind("127.0.0.1:0".parse().unwrap())
        .request_timeout(request_timeout)
        .build()
        .expect("Failed to build server");
    server.start().await.expect("Failed to start server");
    server
}

pub fn bridge_url(server: &Server) -> String {
    format!(
        "ws://{}{}",
        server.local_addr().expect("server not started"),
        server.config().path
    )
}

/// Client with fast, jitter-free reconnects.
pub fn fast_client(server: &Server) -> Client<MemoryDiagram> {
    Client::builder()
        .url(bridge_url(server))
        .reconnect(ReconnectConfig {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(200),
            max_jitter: Duration::ZERO,
            max_attempts: 5,
            ..Default::default()
        })
        .build()
        .expect("Failed to build client")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
