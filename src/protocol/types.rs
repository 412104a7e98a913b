use uuid::Uuid;

/// Unique identifier for connected clients, assigned at admission time.
/// Never reused; lookups by a retired id fail safely.
pub type ClientId = Uuid;

/// Unique identifier for a paired session, generated fresh per pairing.
pub type SessionId = Uuid;

/// Sender tag attached to relayed chat messages. Clients are anonymous, so
/// the only identity the receiving side ever sees is "the partner".
pub const PARTNER_SENDER_TAG: &str = "partner";
