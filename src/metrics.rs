use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collection for the in-memory matchmaking and relay server.
///
/// All counters are monotonic except `active_connections`, which tracks the
/// current registry size.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub websocket_errors: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,

    // Matchmaking metrics
    pub match_requests: AtomicU64,
    pub match_requests_ignored: AtomicU64,
    pub stale_queue_entries_skipped: AtomicU64,
    pub sessions_created: AtomicU64,
    pub sessions_ended: AtomicU64,

    // Relay metrics
    pub signals_relayed: AtomicU64,
    pub chat_messages_relayed: AtomicU64,
    pub typing_events_relayed: AtomicU64,
    pub relay_drops_unpaired: AtomicU64,

    // Presence metrics
    pub presence_broadcasts: AtomicU64,
}

impl ServerMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        self.disconnections.fetch_add(1, Ordering::Relaxed);
        // Saturating: unregistration is idempotent and must never wrap.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
    }

    pub fn increment_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        self.websocket_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_presence_broadcast(&self) {
        self.presence_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture a point-in-time snapshot for the metrics endpoints.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections: ConnectionMetrics {
                total: self.total_connections.load(Ordering::Relaxed),
                active: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                websocket_errors: self.websocket_errors.load(Ordering::Relaxed),
                messages_dropped: self.websocket_messages_dropped.load(Ordering::Relaxed),
            },
            matchmaking: MatchmakingMetrics {
                match_requests: self.match_requests.load(Ordering::Relaxed),
                match_requests_ignored: self.match_requests_ignored.load(Ordering::Relaxed),
                stale_queue_entries_skipped: self
                    .stale_queue_entries_skipped
                    .load(Ordering::Relaxed),
                sessions_created: self.sessions_created.load(Ordering::Relaxed),
                sessions_ended: self.sessions_ended.load(Ordering::Relaxed),
            },
            relay: RelayMetrics {
                signals_relayed: self.signals_relayed.load(Ordering::Relaxed),
                chat_messages_relayed: self.chat_messages_relayed.load(Ordering::Relaxed),
                typing_events_relayed: self.typing_events_relayed.load(Ordering::Relaxed),
                drops_unpaired: self.relay_drops_unpaired.load(Ordering::Relaxed),
            },
            presence_broadcasts: self.presence_broadcasts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`ServerMetrics`] for the HTTP metrics endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connections: ConnectionMetrics,
    pub matchmaking: MatchmakingMetrics,
    pub relay: RelayMetrics,
    pub presence_broadcasts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetrics {
    pub total: u64,
    pub active: u64,
    pub disconnections: u64,
    pub websocket_errors: u64,
    pub messages_dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchmakingMetrics {
    pub match_requests: u64,
    pub match_requests_ignored: u64,
    pub stale_queue_entries_skipped: u64,
    pub sessions_created: u64,
    pub sessions_ended: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayMetrics {
    pub signals_relayed: u64,
    pub chat_messages_relayed: u64,
    pub typing_events_relayed: u64,
    pub drops_unpaired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_connections_never_underflow() {
        let metrics = ServerMetrics::new();
        metrics.increment_connections();
        metrics.decrement_active_connections();
        metrics.decrement_active_connections();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections.active, 0);
        assert_eq!(snapshot.connections.total, 1);
        assert_eq!(snapshot.connections.disconnections, 2);
    }

    #[test]
    fn snapshot_reflects_counter_updates() {
        let metrics = ServerMetrics::new();
        metrics.sessions_created.fetch_add(3, Ordering::Relaxed);
        metrics.signals_relayed.fetch_add(7, Ordering::Relaxed);
        metrics.record_presence_broadcast();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.matchmaking.sessions_created, 3);
        assert_eq!(snapshot.relay.signals_relayed, 7);
        assert_eq!(snapshot.presence_broadcasts, 1);
    }
}
