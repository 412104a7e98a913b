use crate::server::RelayServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the signaling protocol
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<RelayServer>>,
) -> Response {
    // Size enforcement happens in the receive loop, where oversized frames
    // are dropped without tearing down the connection.
    ws.on_upgrade(move |socket| handle_socket(socket, server, addr))
}
