use super::*;
use crate::protocol::{ClientMessage, ServerMessage};
use tokio::time::{timeout, Duration};

type Rx = mpsc::Receiver<Arc<ServerMessage>>;

fn test_server() -> Arc<RelayServer> {
    RelayServer::new(ServerConfig::default())
}

async fn connect(server: &RelayServer) -> (ClientId, Rx) {
    let (tx, rx) = mpsc::channel(32);
    let client_id = server.connect_client(tx).await;
    (client_id, rx)
}

async fn recv_skipping_presence(rx: &mut Rx) -> ServerMessage {
    loop {
        let msg = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed");
        match msg.as_ref() {
            ServerMessage::OnlineCount { .. } => {}
            other => return other.clone(),
        }
    }
}

fn wire(frame: &str) -> ClientMessage {
    serde_json::from_str(frame).expect("valid client frame")
}

#[tokio::test]
async fn find_match_frame_reaches_the_pairing_engine() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;

    server
        .handle_client_message(&a, wire(r#"{"type":"find_match"}"#))
        .await;

    assert!(matches!(
        recv_skipping_presence(&mut rx_a).await,
        ServerMessage::Waiting { .. }
    ));
}

#[tokio::test]
async fn relay_frames_are_routed_to_the_peer() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, mut rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;
    while rx_a.try_recv().is_ok() {}
    while rx_b.try_recv().is_ok() {}

    server
        .handle_client_message(&b, wire(r#"{"type":"typing"}"#))
        .await;
    server
        .handle_client_message(
            &b,
            wire(r#"{"type":"signal","data":{"answer":{"type":"answer"}}}"#),
        )
        .await;

    assert!(matches!(
        recv_skipping_presence(&mut rx_a).await,
        ServerMessage::Typing
    ));
    assert!(matches!(
        recv_skipping_presence(&mut rx_a).await,
        ServerMessage::Signal(_)
    ));
    assert!(rx_b.try_recv().is_err(), "nothing echoes back to the sender");
}

#[tokio::test]
async fn manual_disconnect_frame_is_acknowledged() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;

    server
        .handle_client_message(&a, wire(r#"{"type":"manual_disconnect"}"#))
        .await;

    assert!(matches!(
        recv_skipping_presence(&mut rx_a).await,
        ServerMessage::DisconnectedLocal
    ));
}
