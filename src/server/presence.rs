use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::metrics::ServerMetrics;
use crate::protocol::ServerMessage;

use super::registry::ConnectionRegistry;

/// Push the current online count to every admitted connection.
///
/// Called under the state lock after every admit and every retire, so each
/// broadcast carries the exact post-transition count and there is exactly one
/// broadcast per change — no batching, no debouncing.
pub(crate) fn broadcast_online_count(registry: &ConnectionRegistry, metrics: &ServerMetrics) {
    let count = registry.online_count();
    let message = Arc::new(ServerMessage::OnlineCount { count });

    for (client_id, sender) in registry.senders() {
        if let Err(err) = sender.try_send(Arc::clone(&message)) {
            if matches!(err, TrySendError::Full(_)) {
                metrics.increment_websocket_messages_dropped();
            }
            tracing::debug!(%client_id, error = %err, "Failed to push presence update");
        }
    }

    metrics.record_presence_broadcast();
    tracing::debug!(count, "Presence broadcast");
}
