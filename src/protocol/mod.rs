//! WebSocket message protocol for the matchmaking and signaling relay.
//!
//! All frames are JSON text messages with a `{"type": ..., "data": ...}`
//! envelope. Signaling payloads (`signal`) are opaque to the server: they are
//! routed to the session peer without inspection, and their interpretation
//! (SDP offer/answer, ICE candidates) is entirely a client concern.

mod messages;
mod types;

pub use messages::{ClientMessage, ServerMessage};
pub use types::{ClientId, SessionId, PARTNER_SENDER_TAG};
