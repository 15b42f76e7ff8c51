//! Reconnection and supersession tests

use super::{fast_client, start_server, wait_until};
use drawbridge::core::client::{ClientEvent, ClientState};
use drawbridge::core::DiagramDocument;
use drawbridge::RemoteDiagram;
use std::time::Duration;
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_event(events: &mut broadcast::Receiver<ClientEvent>, wanted: &ClientEvent) {
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("event not seen in time")
            .unwrap();
        if &event == wanted {
            return;
        }
    }
}

#[tokio::test]
async fn test_client_recovers_after_bridge_drops_it() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    let mut events = client.subscribe();
    client.start().await.unwrap();

    let remote = RemoteDiagram::new(server.bridge().clone());
    assert!(wait_until(WAIT, || remote.is_connected()).await);
    remote.add_table(None).await.unwrap();

    // Closing the bridge side is an ordinary disconnect, not a takeover
    server.bridge().close().await;
    wait_event(&mut events, &ClientEvent::Reconnected).await;
    assert!(wait_until(WAIT, || remote.is_connected()).await);

    // Document survived the reconnect
    assert_eq!(remote.get_tables().await.unwrap().len(), 1);

    client.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_new_client_supersedes_old_one() {
    let mut server = start_server(WAIT).await;

    let mut first = fast_client(&server);
    let mut first_events = first.subscribe();
    first.start().await.unwrap();
    let remote = RemoteDiagram::new(server.bridge().clone());
    assert!(wait_until(WAIT, || remote.is_connected()).await);

    let mut second = fast_client(&server);
    second.start().await.unwrap();

    wait_event(&mut first_events, &ClientEvent::Superseded).await;
    assert_eq!(first.state(), ClientState::Superseded);
    // The slot is empty until the replacement grace period ends
    assert!(wait_until(WAIT, || remote.is_connected()).await);

    // Commands now land in the second client's document
    remote.add_table(None).await.unwrap();
    assert_eq!(second.document().tables().len(), 1);
    assert!(first.document().tables().is_empty());

    // The superseded client stays down
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!first.is_running());
    assert!(second.is_connected());

    second.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disabling_client_detaches_it() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    let mut events = client.subscribe();
    client.start().await.unwrap();

    let bridge = server.bridge().clone();
    assert!(wait_until(WAIT, || bridge.is_connected()).await);

    client.shutdown().await;
    wait_event(&mut events, &ClientEvent::Disabled).await;
    assert_eq!(client.state(), ClientState::Disconnected);
    assert!(wait_until(WAIT, || !bridge.is_connected()).await);

    // No reconnect after an explicit disable
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!bridge.is_connected());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_shutdown_gives_client_up() {
    let mut server = start_server(WAIT).await;
    let mut client = fast_client(&server);
    let mut events = client.subscribe();
    client.start().await.unwrap();
    assert!(wait_until(WAIT, || server.bridge().is_connected()).await);

    server.shutdown().await.unwrap();

    wait_event(&mut events, &ClientEvent::GaveUp).await;
    assert_eq!(client.state(), ClientState::Failed);
}
