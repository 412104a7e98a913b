use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::protocol::{ClientId, ServerMessage, SessionId};

use super::RegisterClientError;

/// Lifecycle state of a connection.
///
/// `Idle → Waiting → Paired → Idle`, with retirement possible from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, not searching and not paired.
    Idle,
    /// Enqueued, waiting for a partner.
    Waiting,
    /// Linked to a session peer.
    Paired,
}

/// Per-connection record. Session linkage lives here, in the registry's side
/// table, rather than on any transport object: `peer_id` and `session_id`
/// are set and cleared together, always symmetrically with the peer's record.
#[derive(Debug, Clone)]
pub(crate) struct ClientConnection {
    pub state: ConnectionState,
    pub peer_id: Option<ClientId>,
    pub session_id: Option<SessionId>,
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub client_addr: SocketAddr,
    /// Diagnostics only; never used for correctness.
    pub connected_at: DateTime<Utc>,
}

/// Tracks every currently connected client, with per-IP accounting.
pub(crate) struct ConnectionRegistry {
    connections: HashMap<ClientId, ClientConnection>,
    connections_per_ip: HashMap<IpAddr, usize>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            connections_per_ip: HashMap::new(),
        }
    }

    /// Create and track a new connection in state `Idle`.
    pub fn admit(
        &mut self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
        max_connections_per_ip: usize,
    ) -> Result<ClientId, RegisterClientError> {
        let ip = client_addr.ip();
        let current = self.connections_per_ip.get(&ip).copied().unwrap_or(0);
        if current >= max_connections_per_ip {
            warn!(
                %ip,
                current,
                max = max_connections_per_ip,
                "IP connection limit exceeded"
            );
            return Err(RegisterClientError::IpLimitExceeded {
                current,
                limit: max_connections_per_ip,
            });
        }

        Ok(self.insert(sender, client_addr))
    }

    /// Admit without the per-IP cap (used for testing).
    pub fn admit_unbounded(
        &mut self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> ClientId {
        self.insert(sender, client_addr)
    }

    fn insert(
        &mut self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> ClientId {
        let client_id = Uuid::new_v4();
        self.connections.insert(
            client_id,
            ClientConnection {
                state: ConnectionState::Idle,
                peer_id: None,
                session_id: None,
                sender,
                client_addr,
                connected_at: Utc::now(),
            },
        );
        *self.connections_per_ip.entry(client_addr.ip()).or_insert(0) += 1;
        client_id
    }

    pub fn lookup(&self, client_id: &ClientId) -> Option<&ClientConnection> {
        self.connections.get(client_id)
    }

    pub fn lookup_mut(&mut self, client_id: &ClientId) -> Option<&mut ClientConnection> {
        self.connections.get_mut(client_id)
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.connections.contains_key(client_id)
    }

    /// Remove a connection from tracking. Idempotent: retiring an unknown id
    /// returns `None` without error.
    pub fn retire(&mut self, client_id: &ClientId) -> Option<ClientConnection> {
        let connection = self.connections.remove(client_id)?;
        self.release_ip_slot(connection.client_addr.ip());
        Some(connection)
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    pub fn senders(
        &self,
    ) -> impl Iterator<Item = (&ClientId, &mpsc::Sender<Arc<ServerMessage>>)> {
        self.connections.iter().map(|(id, conn)| (id, &conn.sender))
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &ClientConnection)> {
        self.connections.iter()
    }

    fn release_ip_slot(&mut self, ip: IpAddr) {
        if let Some(count) = self.connections_per_ip.get_mut(&ip) {
            if *count > 1 {
                *count -= 1;
                return;
            }
        }
        self.connections_per_ip.remove(&ip);
    }
}
