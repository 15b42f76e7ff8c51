use super::*;
use crate::connection::testing::connection_pair;
use drawbridge_protocol::ResponseFrame;
use serde_json::json;
use std::time::Duration;

fn test_config() -> BridgeConfig {
    BridgeConfig {
        request_timeout: Duration::from_secs(5),
        replace_grace: Duration::from_millis(10),
        ..Default::default()
    }
}

/// Attach a fresh in-memory connection and return the client end.
async fn attach_client(bridge: &CommandBridge) -> Connection {
    let (server, client) = connection_pair().await;
    bridge.attach(server).await.unwrap();
    client
}

async fn next_command(client: &mut Connection) -> CommandFrame {
    let text = client.next_message().await.expect("connection closed");
    match FrameCodec::new().decode(&text).unwrap() {
        Frame::Command(frame) => frame,
        other => panic!("Expected command frame, got {other:?}"),
    }
}

fn reply(client: &Connection, response: ResponseFrame) {
    let text = FrameCodec::new()
        .encode(&Frame::Response(response))
        .unwrap();
    client.handle.send_text(text).unwrap();
}

#[tokio::test]
async fn test_send_without_connection_fails_fast() {
    let bridge = CommandBridge::new(test_config());
    assert!(!bridge.is_connected());

    let err = bridge.send_command(Command::GetTables {}).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotConnected));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_get_diagram_resolves_with_data() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;
    assert!(bridge.is_connected());

    let responder = tokio::spawn(async move {
        let frame = next_command(&mut client).await;
        assert_eq!(frame.command, "getDiagram");
        assert_eq!(frame.params, json!({}));
        reply(
            &client,
            ResponseFrame::ok(
                frame.id,
                Some(json!({"database": "generic", "tables": []})),
                None,
            ),
        );
        client
    });

    let data = bridge.send_command(Command::GetDiagram {}).await.unwrap();
    assert_eq!(data, json!({"database": "generic", "tables": []}));
    assert_eq!(bridge.pending_count(), 0);
    responder.await.unwrap();
}

#[tokio::test]
async fn test_failure_response_surfaces_error_text() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;

    tokio::spawn(async move {
        let frame = next_command(&mut client).await;
        reply(&client, ResponseFrame::failure(frame.id, "Unknown command: explode"));
        client.closed().await;
    });

    let err = bridge.send_raw("explode", json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "Command failed: Unknown command: explode");
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;

    let responder = tokio::spawn(async move {
        let mut ids = Vec::new();
        for _ in 0..3 {
            let frame = next_command(&mut client).await;
            ids.push(frame.id.clone());
            reply(&client, ResponseFrame::ok(frame.id, None, None));
        }
        ids
    });

    let (a, b, c) = tokio::join!(
        bridge.send_command(Command::GetTables {}),
        bridge.send_command(Command::GetNotes {}),
        bridge.send_command(Command::GetAreas {}),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let mut ids = responder.await.unwrap();
    assert!(ids.iter().all(|id| id.starts_with("cmd_")));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_disconnect_rejects_in_flight_command() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;

    tokio::spawn(async move {
        let frame = next_command(&mut client).await;
        assert_eq!(frame.command, "addTable");
        client.handle.close(1001, "tab closed");
        client.closed().await;
    });

    let err = bridge
        .send_command(Command::AddTable {
            data: None,
            add_to_history: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::ClientDisconnected));
    assert_eq!(bridge.pending_count(), 0);

    // The slot is cleared by the close
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!bridge.is_connected());
}

#[tokio::test]
async fn test_timeout_then_late_response_is_ignored() {
    let bridge = CommandBridge::new(BridgeConfig {
        request_timeout: Duration::from_millis(50),
        ..test_config()
    });
    let mut client = attach_client(&bridge).await;

    let err = bridge.send_command(Command::GetTypes {}).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Timeout { ref command, .. } if command == "getTypes"
    ));
    assert_eq!(bridge.pending_count(), 0);

    // Answer the expired command, then serve a fresh one
    let late = next_command(&mut client).await;
    reply(&client, ResponseFrame::ok(late.id, Some(json!([])), None));

    let responder = tokio::spawn(async move {
        let frame = next_command(&mut client).await;
        reply(&client, ResponseFrame::ok(frame.id, Some(json!(["t1"])), None));
        client
    });
    let data = bridge.send_command(Command::GetTables {}).await.unwrap();
    assert_eq!(data, json!(["t1"]));
    assert!(bridge.is_connected());
    responder.await.unwrap();
}

#[tokio::test]
async fn test_ping_gets_pong_without_pending_entry() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;

    let codec = FrameCodec::new();
    client
        .handle
        .send_text(codec.encode(&Frame::ping()).unwrap())
        .unwrap();

    let text = client.next_message().await.unwrap();
    assert_eq!(codec.decode(&text).unwrap(), Frame::pong());
    assert_eq!(bridge.pending_count(), 0);

    // Exactly one pong: the next frame is the command below
    let responder = tokio::spawn(async move {
        let frame = next_command(&mut client).await;
        reply(&client, ResponseFrame::ok(frame.id, None, None));
        client
    });
    bridge.send_command(Command::GetEnums {}).await.unwrap();
    responder.await.unwrap();
}

#[tokio::test]
async fn test_replacement_closes_old_and_rejects_its_requests() {
    let bridge = CommandBridge::new(test_config());
    let mut first = attach_client(&bridge).await;

    let in_flight = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.send_command(Command::GetDiagram {}).await })
    };
    // Wait until the command is on the wire
    let _ = next_command(&mut first).await;
    assert_eq!(bridge.pending_count(), 1);

    let mut second = attach_client(&bridge).await;

    let err = in_flight.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::ClientDisconnected));

    let (code, reason) = first.closed().await.unwrap();
    assert_eq!(code, CLOSE_NORMAL);
    assert_eq!(reason, REPLACED_CLOSE_REASON);

    assert!(bridge.is_connected());
    let responder = tokio::spawn(async move {
        let frame = next_command(&mut second).await;
        reply(&second, ResponseFrame::ok(frame.id, Some(json!("ok")), None));
        second
    });
    assert_eq!(
        bridge.send_command(Command::GetTables {}).await.unwrap(),
        json!("ok")
    );
    responder.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_attaches_leave_one_connection() {
    let bridge = CommandBridge::new(test_config());
    let (server_a, mut client_a) = connection_pair().await;
    let (server_b, mut client_b) = connection_pair().await;

    let (a, b) = tokio::join!(bridge.attach(server_a), bridge.attach(server_b));
    assert!(a.is_ok() && b.is_ok());
    assert!(bridge.is_connected());

    // Exactly one side is told it was replaced
    let wait = Duration::from_millis(200);
    let closed_a = tokio::time::timeout(wait, client_a.closed()).await.ok().flatten();
    let closed_b = tokio::time::timeout(wait, client_b.closed()).await.ok().flatten();
    match (closed_a, closed_b) {
        (Some((code, reason)), None) | (None, Some((code, reason))) => {
            assert_eq!(code, CLOSE_NORMAL);
            assert_eq!(reason, REPLACED_CLOSE_REASON);
        }
        other => panic!("Expected exactly one replaced connection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attach_contention_rejects_newcomer() {
    let bridge = CommandBridge::new(BridgeConfig {
        attach_wait: Duration::from_millis(20),
        ..test_config()
    });
    let _held = bridge.inner.attach_lock.lock().await;

    let (server, mut client) = connection_pair().await;
    let err = bridge.attach(server).await.unwrap_err();
    assert!(matches!(err, BridgeError::AttachTimeout(_)));

    let (code, reason) = client.closed().await.unwrap();
    assert_eq!(code, CLOSE_TRY_AGAIN_LATER);
    assert_eq!(reason, ATTACH_CONTENTION_REASON);
    assert!(!bridge.is_connected());
}

#[tokio::test]
async fn test_close_rejects_outstanding() {
    let bridge = CommandBridge::new(test_config());
    let mut client = attach_client(&bridge).await;

    let in_flight = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.send_command(Command::GetTables {}).await })
    };
    let _ = next_command(&mut client).await;

    bridge.close().await;
    assert!(matches!(
        in_flight.await.unwrap(),
        Err(BridgeError::ClientDisconnected)
    ));
    assert!(!bridge.is_connected());
    assert!(client.closed().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_default_deadline_applies_on_paused_clock() {
    let bridge = CommandBridge::new(BridgeConfig {
        replace_grace: Duration::from_millis(10),
        ..Default::default()
    });
    let _client = attach_client(&bridge).await;

    let started = tokio::time::Instant::now();
    let err = bridge.send_command(Command::GetDiagram {}).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Timeout { after, .. } if after == Duration::from_secs(30)
    ));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(bridge.pending_count(), 0);
}
