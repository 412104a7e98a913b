use crate::protocol::{ClientId, ClientMessage};

use super::RelayServer;

impl RelayServer {
    /// Dispatch an inbound client event to its state-machine transition.
    ///
    /// Every transition is a silent no-op when its guard fails; nothing here
    /// returns an error to the client.
    pub async fn handle_client_message(&self, client_id: &ClientId, message: ClientMessage) {
        match message {
            ClientMessage::FindMatch => {
                self.handle_find_match(client_id).await;
            }
            ClientMessage::Message { text } => {
                self.handle_chat_message(client_id, text).await;
            }
            ClientMessage::Typing => {
                self.handle_typing(client_id).await;
            }
            ClientMessage::StopTyping => {
                self.handle_stop_typing(client_id).await;
            }
            ClientMessage::Signal(data) => {
                self.handle_signal(client_id, data).await;
            }
            ClientMessage::ManualDisconnect => {
                self.handle_manual_disconnect(client_id).await;
            }
        }
    }
}
