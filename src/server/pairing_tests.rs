use super::*;
use crate::protocol::ServerMessage;
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

async fn recv(rx: &mut Rx) -> ServerMessage {
    let msg = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("channel closed");
    (*msg).clone()
}

async fn recv_skipping_presence(rx: &mut Rx) -> ServerMessage {
    loop {
        match recv(rx).await {
            ServerMessage::OnlineCount { .. } => {}
            other => return other,
        }
    }
}

fn drain(rx: &mut Rx) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push((*msg).clone());
    }
    messages
}

#[tokio::test]
async fn lone_client_is_enqueued_and_told_to_wait() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;

    server.handle_find_match(&a).await;

    match recv_skipping_presence(&mut rx_a).await {
        ServerMessage::Waiting { status } => assert_eq!(status, "Looking for a partner..."),
        other => panic!("expected waiting, got {other:?}"),
    }
    assert_eq!(server.client_state(&a).await, Some(ConnectionState::Waiting));
    assert_eq!(server.waiting_count().await, 1);
    server.assert_invariants().await;
}

#[tokio::test]
async fn second_request_completes_pairing_with_complementary_roles() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, mut rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;

    // Skip the waiting notification A received before B arrived.
    let a_match = loop {
        match recv_skipping_presence(&mut rx_a).await {
            ServerMessage::Waiting { .. } => {}
            other => break other,
        }
    };
    let b_match = recv_skipping_presence(&mut rx_b).await;

    let (a_session, a_initiator) = match a_match {
        ServerMessage::MatchFound {
            session_id,
            is_initiator,
        } => (session_id, is_initiator),
        other => panic!("expected match_found for A, got {other:?}"),
    };
    let (b_session, b_initiator) = match b_match {
        ServerMessage::MatchFound {
            session_id,
            is_initiator,
        } => (session_id, is_initiator),
        other => panic!("expected match_found for B, got {other:?}"),
    };

    assert_eq!(a_session, b_session, "both members share one session id");
    // B requested second and completed the pair, so B originates the offer.
    assert!(b_initiator);
    assert!(!a_initiator);

    assert_eq!(server.client_peer(&a).await, Some(b));
    assert_eq!(server.client_peer(&b).await, Some(a));
    assert_eq!(server.client_session(&a).await, Some(a_session));
    assert_eq!(server.client_state(&a).await, Some(ConnectionState::Paired));
    assert_eq!(server.client_state(&b).await, Some(ConnectionState::Paired));
    assert_eq!(server.waiting_count().await, 0);
    server.assert_invariants().await;
}

#[tokio::test]
async fn third_client_waits_while_pair_is_busy() {
    let server = test_server();
    let (a, _rx_a) = connect(&server).await;
    let (b, _rx_b) = connect(&server).await;
    let (c, mut rx_c) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;
    server.handle_find_match(&c).await;

    assert!(matches!(
        recv_skipping_presence(&mut rx_c).await,
        ServerMessage::Waiting { .. }
    ));
    assert_eq!(server.client_state(&c).await, Some(ConnectionState::Waiting));
    assert_eq!(server.client_peer(&c).await, None);
    assert_eq!(server.waiting_count().await, 1);
    server.assert_invariants().await;
}

#[tokio::test]
async fn clients_are_matched_in_arrival_order() {
    let server = test_server();
    let mut clients = Vec::new();
    for _ in 0..6 {
        clients.push(connect(&server).await);
    }

    for (client_id, _) in &clients {
        server.handle_find_match(client_id).await;
    }

    // Strict FIFO: (0,1), (2,3), (4,5).
    for pair in clients.chunks(2) {
        let (first, _) = &pair[0];
        let (second, _) = &pair[1];
        assert_eq!(server.client_peer(first).await, Some(*second));
        assert_eq!(server.client_peer(second).await, Some(*first));
    }
    assert_eq!(server.waiting_count().await, 0);
    server.assert_invariants().await;
}

#[tokio::test]
async fn duplicate_request_while_waiting_is_ignored() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;

    server.handle_find_match(&a).await;
    let _ = recv_skipping_presence(&mut rx_a).await;
    drain(&mut rx_a);

    server.handle_find_match(&a).await;

    assert!(drain(&mut rx_a).is_empty(), "duplicate request must be silent");
    assert_eq!(server.waiting_count().await, 1);
    assert_eq!(
        server
            .metrics()
            .match_requests_ignored
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
    server.assert_invariants().await;
}

#[tokio::test]
async fn request_while_paired_does_not_overwrite_session() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, _rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;
    let session = server.client_session(&a).await.expect("A is paired");
    drain(&mut rx_a);

    server.handle_find_match(&a).await;

    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(server.client_session(&a).await, Some(session));
    assert_eq!(server.client_peer(&a).await, Some(b));
    server.assert_invariants().await;
}

#[tokio::test]
async fn abrupt_disconnect_notifies_survivor_exactly_once() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, _rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;
    drain(&mut rx_a);

    server.unregister_client(&b).await;

    let messages = drain(&mut rx_a);
    let partner_gone = messages
        .iter()
        .filter(|msg| matches!(msg, ServerMessage::PartnerDisconnected))
        .count();
    let presence: Vec<_> = messages
        .iter()
        .filter_map(|msg| match msg {
            ServerMessage::OnlineCount { count } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(partner_gone, 1, "exactly one partner_disconnected");
    assert_eq!(presence, vec![1], "exactly one presence broadcast");

    assert_eq!(server.client_state(&a).await, Some(ConnectionState::Idle));
    assert_eq!(server.client_peer(&a).await, None);
    assert_eq!(server.client_state(&b).await, None, "B is retired");
    assert_eq!(server.online_count().await, 1);
    server.assert_invariants().await;
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, _rx_b) = connect(&server).await;
    drain(&mut rx_a);

    server.unregister_client(&b).await;
    drain(&mut rx_a);
    server.unregister_client(&b).await;

    assert!(drain(&mut rx_a).is_empty(), "second retire must not broadcast");
    assert_eq!(server.online_count().await, 1);
    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.connections.active, 1);
    assert_eq!(snapshot.connections.disconnections, 1);
}

#[tokio::test]
async fn manual_disconnect_while_waiting_leaves_queue_silently() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, mut rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    server.handle_manual_disconnect(&a).await;

    let a_messages = drain(&mut rx_a);
    assert_eq!(a_messages, vec![ServerMessage::DisconnectedLocal]);
    assert!(
        drain(&mut rx_b).is_empty(),
        "nobody receives partner_disconnected"
    );
    assert_eq!(server.waiting_count().await, 0);
    assert_eq!(server.client_state(&a).await, Some(ConnectionState::Idle));
    assert_eq!(server.online_count().await, 2, "A stays connected");
    server.assert_invariants().await;
}

#[tokio::test]
async fn manual_disconnect_while_paired_frees_both_sides_to_rematch() {
    let server = test_server();
    let (a, mut rx_a) = connect(&server).await;
    let (b, mut rx_b) = connect(&server).await;

    server.handle_find_match(&a).await;
    server.handle_find_match(&b).await;
    let first_session = server.client_session(&a).await.expect("paired");
    drain(&mut rx_a);
    drain(&mut rx_b);

    server.handle_manual_disconnect(&b).await;

    assert_eq!(drain(&mut rx_a), vec![ServerMessage::PartnerDisconnected]);
    assert_eq!(drain(&mut rx_b), vec![ServerMessage::DisconnectedLocal]);
    assert_eq!(server.client_state(&a).await, Some(ConnectionState::Idle));
    assert_eq!(server.client_state(&b).await, Some(ConnectionState::Idle));
    server.assert_invariants().await;

    // Both remain connected and can pair again, under a fresh session id.
    server.handle_find_match(&b).await;
    server.handle_find_match(&a).await;

    let second_session = server.client_session(&a).await.expect("re-paired");
    assert_ne!(first_session, second_session);
    assert_eq!(server.client_peer(&a).await, Some(b));
    server.assert_invariants().await;
}

#[tokio::test]
async fn online_count_broadcasts_once_per_admit_and_retire() {
    let server = test_server();
    let (_a, mut rx_a) = connect(&server).await;
    let (_b, _rx_b) = connect(&server).await;
    let (c, _rx_c) = connect(&server).await;

    server.unregister_client(&c).await;

    let counts: Vec<_> = drain(&mut rx_a)
        .into_iter()
        .filter_map(|msg| match msg {
            ServerMessage::OnlineCount { count } => Some(count),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![1, 2, 3, 2]);
    assert_eq!(server.online_count().await, 2);
}
