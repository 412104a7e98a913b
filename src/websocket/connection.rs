use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::{RegisterClientError, RelayServer};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::sending::send_text_message;

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<RelayServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let queue_capacity = server.config().send_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    // Register client with server
    let client_id = match server.register_client(tx, addr).await {
        Ok(client_id) => {
            tracing::info!(%client_id, client_addr = %addr, "WebSocket connection established");
            client_id
        }
        Err(RegisterClientError::IpLimitExceeded { current, limit }) => {
            tracing::warn!(
                client_addr = %addr,
                current,
                limit,
                "Rejected connection, per-IP limit exceeded"
            );
            let _ = sender.close().await;
            return;
        }
    };

    // Spawn task to handle outgoing messages
    let server_clone = server.clone();
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_text_message(&mut sender, &message, &client_id)
                .await
                .is_err()
            {
                break;
            }
        }

        // Cleanup when send task ends
        server_clone.unregister_client(&client_id).await;
    });

    // Handle incoming messages
    let server_clone = server.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%client_id, "WebSocket error: {}", e);
                    server_clone.metrics().increment_websocket_errors();
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    // Oversized and malformed frames are dropped, not answered.
                    let max_size = server_clone.config().max_message_size;
                    if text.len() > max_size {
                        tracing::warn!(
                            %client_id,
                            size = text.len(),
                            max = max_size,
                            "Dropped frame exceeding size limit"
                        );
                        server_clone.metrics().increment_websocket_errors();
                        continue;
                    }

                    let client_message: ClientMessage = match serde_json::from_str(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!(
                                %client_id,
                                error = %err,
                                "Dropped unparseable client frame"
                            );
                            server_clone.metrics().increment_websocket_errors();
                            continue;
                        }
                    };

                    server_clone
                        .handle_client_message(&client_id, client_message)
                        .await;
                }
                Message::Close(_) => {
                    tracing::info!(%client_id, "WebSocket connection closed");
                    break;
                }
                Message::Binary(_) => {
                    tracing::debug!(%client_id, "Ignoring binary frame, protocol is text only");
                }
                _ => {
                    // Ping/Pong are handled by the transport.
                }
            }
        }

        // Cleanup when receive task ends
        server_clone.unregister_client(&client_id).await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {
            tracing::debug!(%client_id, "Send task completed");
        }
        _ = receive_task => {
            tracing::debug!(%client_id, "Receive task completed");
        }
    }

    // Ensure cleanup
    server.unregister_client(&client_id).await;
}
