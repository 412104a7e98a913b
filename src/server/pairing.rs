use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::protocol::{ClientId, ServerMessage, SessionId};

use super::registry::ConnectionState;
use super::{deliver, CoreState, RelayServer};

impl CoreState {
    /// Clear the session linkage on both members, atomically with respect to
    /// the state lock held by the caller. Returns the surviving peer's id and
    /// sender when the peer is still registered, so the caller can dispatch
    /// the `partner_disconnected` notification.
    pub(crate) fn dissolve_session(
        &mut self,
        client_id: &ClientId,
    ) -> Option<(ClientId, mpsc::Sender<Arc<ServerMessage>>)> {
        let conn = self.registry.lookup_mut(client_id)?;
        let peer_id = conn.peer_id.take()?;
        conn.session_id = None;
        conn.state = ConnectionState::Idle;

        let peer = self.registry.lookup_mut(&peer_id)?;
        peer.peer_id = None;
        peer.session_id = None;
        peer.state = ConnectionState::Idle;
        Some((peer_id, peer.sender.clone()))
    }
}

impl RelayServer {
    /// Handle a `find_match` request: pair with the longest-waiting live
    /// client, or enqueue. The dequeue-verify-link sequence runs as one
    /// atomic step under the state lock, so a concurrent request can never
    /// observe a half-linked session.
    pub async fn handle_find_match(&self, client_id: &ClientId) {
        let mut state = self.state.lock().await;
        self.metrics.match_requests.fetch_add(1, Ordering::Relaxed);

        let Some(conn) = state.registry.lookup(client_id) else {
            tracing::debug!(%client_id, "Match request from retired connection ignored");
            return;
        };
        // Idempotency guard: a request while Waiting or Paired is a no-op,
        // never a duplicate queue entry or a pairing overwrite.
        if conn.state != ConnectionState::Idle {
            self.metrics
                .match_requests_ignored
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%client_id, state = ?conn.state, "Redundant match request ignored");
            return;
        }
        let requester_sender = conn.sender.clone();

        let CoreState { registry, queue } = &mut *state;
        let outcome = queue.dequeue_next(|candidate| {
            candidate != client_id
                && registry
                    .lookup(candidate)
                    .is_some_and(|c| c.state == ConnectionState::Waiting && c.peer_id.is_none())
        });
        if outcome.stale_skipped > 0 {
            self.metrics
                .stale_queue_entries_skipped
                .fetch_add(outcome.stale_skipped, Ordering::Relaxed);
            tracing::debug!(
                %client_id,
                skipped = outcome.stale_skipped,
                "Discarded stale waiting-queue entries"
            );
        }

        match outcome.partner {
            Some(partner_id) => {
                let session_id = SessionId::new_v4();

                let Some(partner) = registry.lookup_mut(&partner_id) else {
                    // dequeue_next verified liveness under this same lock
                    tracing::warn!(%partner_id, "Dequeued partner vanished mid-pairing");
                    return;
                };
                partner.state = ConnectionState::Paired;
                partner.peer_id = Some(*client_id);
                partner.session_id = Some(session_id);
                let partner_sender = partner.sender.clone();

                if let Some(conn) = registry.lookup_mut(client_id) {
                    conn.state = ConnectionState::Paired;
                    conn.peer_id = Some(partner_id);
                    conn.session_id = Some(session_id);
                }

                // The requester completed the pair, so it originates the
                // peer-to-peer offer; the dequeued partner answers.
                deliver(
                    &requester_sender,
                    client_id,
                    ServerMessage::MatchFound {
                        session_id,
                        is_initiator: true,
                    },
                    &self.metrics,
                );
                deliver(
                    &partner_sender,
                    &partner_id,
                    ServerMessage::MatchFound {
                        session_id,
                        is_initiator: false,
                    },
                    &self.metrics,
                );
                self.metrics.sessions_created.fetch_add(1, Ordering::Relaxed);
                tracing::info!(%client_id, %partner_id, %session_id, "Clients paired");
            }
            None => {
                if let Some(conn) = registry.lookup_mut(client_id) {
                    conn.state = ConnectionState::Waiting;
                }
                queue.enqueue(*client_id);
                deliver(
                    &requester_sender,
                    client_id,
                    ServerMessage::Waiting {
                        status: self.config.waiting_status.clone(),
                    },
                    &self.metrics,
                );
                tracing::info!(%client_id, "Client enqueued for matchmaking");
            }
        }
    }

    /// Handle a `manual_disconnect`: leave the queue and/or the current
    /// session but keep the connection open, returning to `Idle` so the
    /// client can immediately search again. The departing side is always
    /// acknowledged with `disconnected_local`, even when it was idle.
    pub async fn handle_manual_disconnect(&self, client_id: &ClientId) {
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
            tracing::info!(%client_id, %peer_id, "Session left voluntarily, survivor notified");
        }

        if let Some(conn) = state.registry.lookup_mut(client_id) {
            conn.state = ConnectionState::Idle;
            let sender = conn.sender.clone();
            deliver(
                &sender,
                client_id,
                ServerMessage::DisconnectedLocal,
                &self.metrics,
            );
        }
    }
}
