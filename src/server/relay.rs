use std::sync::atomic::Ordering;

use crate::protocol::{ClientId, ServerMessage, PARTNER_SENDER_TAG};

use super::{deliver, RelayServer};

impl RelayServer {
    /// Forward a signaling envelope to the sender's session peer, verbatim.
    pub async fn handle_signal(&self, client_id: &ClientId, data: serde_json::Value) {
        if self
            .relay_to_peer(client_id, ServerMessage::Signal(data))
            .await
        {
            self.metrics.signals_relayed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Forward chat text to the session peer, tagged as coming from
    /// "the partner" — clients are anonymous and never see each other's ids.
    pub async fn handle_chat_message(&self, client_id: &ClientId, text: String) {
        if self
            .relay_to_peer(
                client_id,
                ServerMessage::Message {
                    text,
                    sender: PARTNER_SENDER_TAG.to_string(),
                },
            )
            .await
        {
            self.metrics
                .chat_messages_relayed
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Forward a typing indicator to the session peer.
    pub async fn handle_typing(&self, client_id: &ClientId) {
        if self.relay_to_peer(client_id, ServerMessage::Typing).await {
            self.metrics
                .typing_events_relayed
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Forward a typing-stopped indicator to the session peer.
    pub async fn handle_stop_typing(&self, client_id: &ClientId) {
        if self
            .relay_to_peer(client_id, ServerMessage::StopTyping)
            .await
        {
            self.metrics
                .typing_events_relayed
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Route-if-paired, else drop. An unpaired sender or a retired peer is a
    /// silent no-op: the payload is not queued and no error goes back to the
    /// sender. Returns whether the payload was handed to the peer's queue.
    async fn relay_to_peer(&self, from: &ClientId, message: ServerMessage) -> bool {
        let state = self.state.lock().await;

        let Some(peer_id) = state.registry.lookup(from).and_then(|conn| conn.peer_id) else {
            self.metrics
                .relay_drops_unpaired
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%from, "Relay dropped, sender is not paired");
            return false;
        };
        let Some(peer) = state.registry.lookup(&peer_id) else {
            self.metrics
                .relay_drops_unpaired
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%from, %peer_id, "Relay dropped, peer already retired");
            return false;
        };

        deliver(&peer.sender, &peer_id, message, &self.metrics);
        true
    }
}
