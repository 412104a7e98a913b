use crate::metrics::MetricsSnapshot;
use chrono::Utc;

/// Render a metrics snapshot into Prometheus text exposition format.
pub(crate) fn render_prometheus_metrics(snapshot: &MetricsSnapshot) -> String {
    use std::fmt::Write;

    fn write_metric(buf: &mut String, name: &str, help: &str, metric_type: &str, value: f64) {
        let _ = writeln!(buf, "# HELP {name} {help}");
        let _ = writeln!(buf, "# TYPE {name} {metric_type}");
        let _ = writeln!(buf, "{name} {value}");
    }

    fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "counter", value as f64);
    }

    fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "gauge", value as f64);
    }

    let mut buf = String::new();

    counter(
        &mut buf,
        "voicelink_connections_total",
        "Total connections accepted since startup",
        snapshot.connections.total,
    );
    gauge(
        &mut buf,
        "voicelink_connections_active",
        "Number of currently active connections",
        snapshot.connections.active,
    );
    counter(
        &mut buf,
        "voicelink_connections_disconnections_total",
        "Total connection closures observed since startup",
        snapshot.connections.disconnections,
    );
    counter(
        &mut buf,
        "voicelink_websocket_errors_total",
        "Transport errors and unparseable client frames",
        snapshot.connections.websocket_errors,
    );
    counter(
        &mut buf,
        "voicelink_websocket_messages_dropped_total",
        "Server messages dropped because the outbound WebSocket buffer was full",
        snapshot.connections.messages_dropped,
    );

    counter(
        &mut buf,
        "voicelink_match_requests_total",
        "Total match requests received since startup",
        snapshot.matchmaking.match_requests,
    );
    counter(
        &mut buf,
        "voicelink_match_requests_ignored_total",
        "Match requests ignored because the sender was already waiting or paired",
        snapshot.matchmaking.match_requests_ignored,
    );
    counter(
        &mut buf,
        "voicelink_stale_queue_entries_skipped_total",
        "Queue entries skipped during pairing because the candidate was no longer eligible",
        snapshot.matchmaking.stale_queue_entries_skipped,
    );
    counter(
        &mut buf,
        "voicelink_sessions_created_total",
        "Total sessions created since startup",
        snapshot.matchmaking.sessions_created,
    );
    counter(
        &mut buf,
        "voicelink_sessions_ended_total",
        "Total sessions torn down since startup",
        snapshot.matchmaking.sessions_ended,
    );

    counter(
        &mut buf,
        "voicelink_signals_relayed_total",
        "Signaling envelopes relayed between session peers",
        snapshot.relay.signals_relayed,
    );
    counter(
        &mut buf,
        "voicelink_chat_messages_relayed_total",
        "Chat messages relayed between session peers",
        snapshot.relay.chat_messages_relayed,
    );
    counter(
        &mut buf,
        "voicelink_typing_events_relayed_total",
        "Typing indicators relayed between session peers",
        snapshot.relay.typing_events_relayed,
    );
    counter(
        &mut buf,
        "voicelink_relay_drops_unpaired_total",
        "Relay payloads dropped because the sender had no live session peer",
        snapshot.relay.drops_unpaired,
    );

    counter(
        &mut buf,
        "voicelink_presence_broadcasts_total",
        "Online-count broadcasts sent since startup",
        snapshot.presence_broadcasts,
    );

    gauge(
        &mut buf,
        "voicelink_scrape_timestamp_seconds",
        "Unix timestamp of this scrape",
        Utc::now().timestamp().max(0) as u64,
    );

    buf
}
