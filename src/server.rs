use crate::metrics::ServerMetrics;
use crate::protocol::{ClientId, ServerMessage, SessionId};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use uuid::Uuid;

mod message_router;
#[cfg(test)]
mod message_router_tests;
mod pairing;
#[cfg(test)]
mod pairing_tests;
mod presence;
mod queue;
mod registry;
mod relay;

pub use registry::ConnectionState;

use queue::WaitingQueue;
use registry::ConnectionRegistry;

/// Matchmaking and signaling relay server.
///
/// All registry, queue and session mutations happen under one mutex so that
/// concurrent match requests, disconnects and relays observe a consistent
/// state. Nothing inside the lock blocks on network I/O: outbound sends are
/// fire-and-forget `try_send` calls on bounded channels.
pub struct RelayServer {
    /// Registry, waiting queue and session linkage, guarded as a unit.
    state: Mutex<CoreState>,
    /// Server configuration
    config: ServerConfig,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Instance identifier
    instance_id: Uuid,
}

/// Shared mutable core: the connection table and the FIFO waiting queue.
/// Message handlers never touch these directly; every mutation goes through
/// the registry/queue/pairing contracts.
pub(crate) struct CoreState {
    pub registry: ConnectionRegistry,
    pub queue: WaitingQueue,
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum inbound WebSocket frame size in bytes
    pub max_message_size: usize,
    /// Maximum concurrent connections per client IP
    pub max_connections_per_ip: usize,
    /// Require bearer-token auth on the metrics endpoints
    pub require_metrics_auth: bool,
    /// Bearer token for the metrics endpoints (if required)
    pub metrics_auth_token: Option<String>,
    /// Status text sent with the `waiting` event
    pub waiting_status: String,
    /// Capacity of each connection's outbound message queue
    pub send_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: 65536, // 64KB, enough for any SDP blob
            max_connections_per_ip: 16,
            require_metrics_auth: false,
            metrics_auth_token: None,
            waiting_status: "Looking for a partner...".to_string(),
            send_queue_capacity: 64,
        }
    }
}

impl RelayServer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CoreState {
                registry: ConnectionRegistry::new(),
                queue: WaitingQueue::new(),
            }),
            config,
            metrics: Arc::new(ServerMetrics::new()),
            instance_id: Uuid::new_v4(),
        })
    }

    /// Admit a new client connection.
    ///
    /// The presence count is broadcast to every connection, including the new
    /// one, before this returns.
    pub async fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<ClientId, RegisterClientError> {
        let mut state = self.state.lock().await;
        let client_id =
            state
                .registry
                .admit(sender, client_addr, self.config.max_connections_per_ip)?;
        self.metrics.increment_connections();
        presence::broadcast_online_count(&state.registry, &self.metrics);
        tracing::info!(
            %client_id,
            client_addr = %client_addr,
            instance_id = %self.instance_id,
            online = state.registry.online_count(),
            "Client admitted"
        );
        Ok(client_id)
    }

    /// Retire a client connection, tearing down its session if paired.
    ///
    /// Idempotent: retiring an unknown or already-retired id is a no-op, so
    /// the transport layer may call this from every exit path.
    pub async fn unregister_client(&self, client_id: &ClientId) {
        let mut state = self.state.lock().await;
        if !state.registry.contains(client_id) {
            return;
        }

        state.queue.remove(client_id);

        if let Some((peer_id, peer_sender)) = state.dissolve_session(client_id) {
            deliver(
                &peer_sender,
                &peer_id,
                ServerMessage::PartnerDisconnected,
                &self.metrics,
            );
            self.metrics.sessions_ended.fetch_add(1, Ordering::Relaxed);
            tracing::info!(%client_id, %peer_id, "Session torn down, survivor notified");
        }

        state.registry.retire(client_id);
        self.metrics.decrement_active_connections();
        presence::broadcast_online_count(&state.registry, &self.metrics);
        tracing::info!(
            %client_id,
            instance_id = %self.instance_id,
            online = state.registry.online_count(),
            "Client retired"
        );
    }

    /// Connect a client without a real socket (used for testing).
    pub async fn connect_client(&self, sender: mpsc::Sender<Arc<ServerMessage>>) -> ClientId {
        let mut state = self.state.lock().await;
        let addr: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 0));
        let client_id = state.registry.admit_unbounded(sender, addr);
        self.metrics.increment_connections();
        presence::broadcast_online_count(&state.registry, &self.metrics);
        client_id
    }

    /// Get server configuration
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server metrics
    #[must_use]
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Number of currently admitted connections.
    pub async fn online_count(&self) -> usize {
        self.state.lock().await.registry.online_count()
    }

    /// Number of connections currently waiting for a partner.
    pub async fn waiting_count(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Lifecycle state of a connection, if it is still registered.
    pub async fn client_state(&self, client_id: &ClientId) -> Option<ConnectionState> {
        let state = self.state.lock().await;
        state.registry.lookup(client_id).map(|conn| conn.state)
    }

    /// Session peer of a connection, if it is currently paired.
    pub async fn client_peer(&self, client_id: &ClientId) -> Option<ClientId> {
        let state = self.state.lock().await;
        state.registry.lookup(client_id).and_then(|conn| conn.peer_id)
    }

    /// Session id of a connection, if it is currently paired.
    pub async fn client_session(&self, client_id: &ClientId) -> Option<SessionId> {
        let state = self.state.lock().await;
        state
            .registry
            .lookup(client_id)
            .and_then(|conn| conn.session_id)
    }

    /// Liveness probe for the `/health` endpoint: verifies the core state
    /// lock can still be acquired.
    pub async fn health_check(&self) -> bool {
        drop(self.state.lock().await);
        true
    }
}

/// Fire-and-forget delivery to one connection's outbound queue. Full or
/// closed channels are logged and counted, never propagated: delivery is
/// best-effort with no retry.
pub(crate) fn deliver(
    sender: &mpsc::Sender<Arc<ServerMessage>>,
    client_id: &ClientId,
    message: ServerMessage,
    metrics: &ServerMetrics,
) {
    if let Err(err) = sender.try_send(Arc::new(message)) {
        if matches!(err, TrySendError::Full(_)) {
            metrics.increment_websocket_messages_dropped();
        }
        tracing::debug!(%client_id, error = %err, "Dropped outbound message");
    }
}

#[cfg(test)]
impl RelayServer {
    /// Structural invariant check used by the engine tests after mutations:
    /// peer/session fields are set together and symmetric, paired connections
    /// never sit in the waiting queue, and every queue entry is registered.
    pub(crate) async fn assert_invariants(&self) {
        let state = self.state.lock().await;
        for (client_id, conn) in state.registry.iter() {
            assert_eq!(
                conn.peer_id.is_some(),
                conn.session_id.is_some(),
                "{client_id}: peer_id and session_id must be set together"
            );
            assert_eq!(
                conn.state == ConnectionState::Paired,
                conn.peer_id.is_some(),
                "{client_id}: Paired state must match peer linkage"
            );
            assert_eq!(
                conn.state == ConnectionState::Waiting,
                state.queue.contains(client_id),
                "{client_id}: Waiting state must match queue membership"
            );
            if let Some(peer_id) = conn.peer_id {
                assert!(
                    !state.queue.contains(client_id),
                    "{client_id}: paired connection present in waiting queue"
                );
                let peer = state
                    .registry
                    .lookup(&peer_id)
                    .unwrap_or_else(|| panic!("{client_id}: dangling peer {peer_id}"));
                assert_eq!(peer.peer_id, Some(*client_id), "session must be symmetric");
                assert_eq!(peer.session_id, conn.session_id, "session ids must match");
            }
        }
        for queued in state.queue.iter() {
            assert!(
                state.registry.contains(queued),
                "{queued}: waiting queue holds a retired connection"
            );
        }
    }
}
