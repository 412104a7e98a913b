use serde::{Deserialize, Serialize};

use super::types::SessionId;

/// Message types sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request a partner. Queued FIFO if nobody is waiting.
    FindMatch,
    /// Chat text for the session peer. Opaque payload, no inspection.
    Message { text: String },
    /// Typing indicator for the session peer.
    Typing,
    /// Typing stopped indicator for the session peer.
    StopTyping,
    /// WebRTC signaling envelope (offer/answer/ICE candidate).
    /// Routed verbatim to the session peer.
    Signal(serde_json::Value),
    /// Leave the current session (or the waiting queue) while keeping the
    /// connection open, e.g. to immediately search again.
    ManualDisconnect,
}

/// Message types sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Enqueued; no partner available yet.
    Waiting { status: String },
    /// Pairing complete. Exactly one member of the pair is the initiator and
    /// originates the peer-to-peer offer.
    MatchFound {
        session_id: SessionId,
        is_initiator: bool,
    },
    /// The session peer left (abruptly or via manual disconnect).
    PartnerDisconnected,
    /// Manual disconnect acknowledged; the connection is back to idle.
    DisconnectedLocal,
    /// Presence broadcast: number of currently connected clients.
    OnlineCount { count: usize },
    /// Relayed chat text from the session peer.
    Message { text: String, sender: String },
    /// Relayed typing indicator.
    Typing,
    /// Relayed typing stopped indicator.
    StopTyping,
    /// Relayed signaling envelope, same shape as the inbound frame.
    Signal(serde_json::Value),
}
