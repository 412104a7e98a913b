use crate::protocol::{ClientId, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;

pub(super) async fn send_text_message(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    client_id: &ClientId,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(%client_id, "Failed to serialize message: {}", e);
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::warn!(%client_id, "Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}
