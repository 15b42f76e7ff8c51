//! End-to-end command tests
//!
//! Server, reconnecting client over an in-memory document, and bare
//! WebSocket peers that answer by hand.

use super::{bridge_url, fast_client, start_server, wait_until};
use drawbridge::core::DiagramDocument;
use drawbridge::protocol::{Command, Field, Table, TableUpdate};
use drawbridge::{BridgeError, RemoteDiagram};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn next_json<S>(stream: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::time::timeout(WAIT, stream.next())
            .await
            .expect("no frame in time")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_client_executes_typed_commands() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    client.start().await.expect("client failed to connect");

    let bridge = server.bridge().clone();
    assert!(wait_until(WAIT, || bridge.is_connected()).await);
    let remote = RemoteDiagram::new(bridge);

    let created = remote.add_table(None).await.unwrap();
    assert_eq!(created.fields[0].name, "id");

    remote
        .update_table(
            &created.id,
            TableUpdate {
                name: Some("users".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    remote
        .add_field(
            &created.id,
            Field {
                id: "email".into(),
                name: "email".into(),
                data_type: "VARCHAR".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let users = remote.get_table_by_name("users").await.unwrap();
    assert_eq!(users.id, created.id);
    assert_eq!(users.fields.len(), 2);

    remote.set_database("postgresql").await.unwrap();
    let diagram = remote.get_diagram().await.unwrap();
    assert_eq!(diagram.database, "postgresql");
    assert_eq!(diagram.tables.len(), 1);

    // The client's document is the one being edited
    assert_eq!(client.document().tables()[0].name, "users");

    client.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_document_errors_come_back_as_command_failures() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    client.start().await.unwrap();
    let remote = RemoteDiagram::new(server.bridge().clone());
    assert!(wait_until(WAIT, || remote.is_connected()).await);

    let err = remote.delete_table("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Command failed: Table missing not found");

    let err = remote.get_table_by_name("ghosts").await.unwrap_err();
    assert!(matches!(err, BridgeError::CommandFailed(ref m) if m == "Table not found: ghosts"));

    client.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_import_replaces_the_document() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    client.start().await.unwrap();
    let remote = RemoteDiagram::new(server.bridge().clone());
    assert!(wait_until(WAIT, || remote.is_connected()).await);

    remote.add_table(None).await.unwrap();
    let imported = drawbridge::protocol::Diagram {
        database: "mysql".into(),
        tables: vec![Table {
            id: "orders".into(),
            name: "orders".into(),
            ..Default::default()
        }],
        ..Default::default()
    };
    remote.import_diagram(imported, true).await.unwrap();

    let tables = remote.get_tables().await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].id, "orders");

    client.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bare_peer_correlates_out_of_order_responses() {
    let mut server = start_server(WAIT).await;
    let (ws, _) = tokio_tungstenite::connect_async(bridge_url(&server))
        .await
        .unwrap();
    let (mut sink, mut stream) = ws.split();
    let bridge = server.bridge().clone();
    assert!(wait_until(WAIT, || bridge.is_connected()).await);

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_command(Command::GetTables {}).await }
    });
    let second = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_command(Command::GetNotes {}).await }
    });

    let a = next_json(&mut stream).await;
    let b = next_json(&mut stream).await;
    assert_ne!(a["id"], b["id"]);

    // Answer in reverse order, echoing the command name as data
    for frame in [b, a] {
        let reply = json!({"id": frame["id"], "success": true, "data": frame["command"]});
        sink.send(Message::text(reply.to_string())).await.unwrap();
    }

    assert_eq!(first.await.unwrap().unwrap(), json!("getTables"));
    assert_eq!(second.await.unwrap().unwrap(), json!("getNotes"));
    assert_eq!(bridge.pending_count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bare_peer_ping_gets_pong() {
    let mut server = start_server(WAIT).await;
    let (ws, _) = tokio_tungstenite::connect_async(bridge_url(&server))
        .await
        .unwrap();
    let (mut sink, mut stream) = ws.split();

    sink.send(Message::text(r#"{"type":"ping"}"#)).await.unwrap();
    assert_eq!(next_json(&mut stream).await, json!({"type": "pong"}));
    assert_eq!(server.bridge().pending_count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_rejects_in_flight_command() {
    let mut server = start_server(WAIT).await;
    let (ws, _) = tokio_tungstenite::connect_async(bridge_url(&server))
        .await
        .unwrap();
    let (sink, mut stream) = ws.split();
    let bridge = server.bridge().clone();
    assert!(wait_until(WAIT, || bridge.is_connected()).await);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .send_raw("addTable", json!({"data": {"name": "users"}}))
                .await
        }
    });

    let command = next_json(&mut stream).await;
    assert_eq!(command["command"], "addTable");
    drop(stream);
    drop(sink);

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::ClientDisconnected));
    assert!(wait_until(WAIT, || !bridge.is_connected()).await);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let mut server = start_server(Duration::from_millis(100)).await;
    let (_ws, _) = tokio_tungstenite::connect_async(bridge_url(&server))
        .await
        .unwrap();
    let bridge = server.bridge().clone();
    assert!(wait_until(WAIT, || bridge.is_connected()).await);

    let err = bridge.send_command(Command::GetDiagram {}).await.unwrap_err();
    assert_eq!(err.to_string(), "Command getDiagram timed out after 100ms");
    assert_eq!(bridge.pending_count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_command_without_client_fails_fast() {
    let mut server = start_server(WAIT).await;
    let remote = RemoteDiagram::new(server.bridge().clone());

    let err = remote.get_diagram().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotConnected));

    server.shutdown().await.unwrap();
}
