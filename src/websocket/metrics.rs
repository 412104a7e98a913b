use crate::server::RelayServer;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;

use super::prometheus::render_prometheus_metrics;

fn enforce_metrics_auth(headers: &HeaderMap, server: &RelayServer) -> Result<(), StatusCode> {
    let config = server.config();
    let Some(raw_header) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Unauthorized metrics access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("Unauthorized metrics access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = config.metrics_auth_token.as_deref() {
        if token == expected {
            tracing::debug!("Metrics access authorized via bearer token");
            return Ok(());
        }
    }

    tracing::warn!("Unauthorized metrics access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// Metrics API endpoint - returns real data from server metrics
pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<RelayServer>>,
) -> axum::response::Result<axum::response::Json<serde_json::Value>> {
    // Check authentication if required
    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let now = chrono::Utc::now();
    let snapshot = server.metrics().snapshot();
    let online = server.online_count().await;
    let waiting = server.waiting_count().await;

    let response = serde_json::json!({
        "timestamp": now.to_rfc3339(),
        "instanceId": server.instance_id(),
        "onlineCount": online,
        "waitingCount": waiting,
        "serverMetrics": {
            "connections": {
                "total": snapshot.connections.total,
                "active": snapshot.connections.active,
                "disconnections": snapshot.connections.disconnections,
                "websocketErrors": snapshot.connections.websocket_errors,
                "messagesDropped": snapshot.connections.messages_dropped
            },
            "matchmaking": {
                "requests": snapshot.matchmaking.match_requests,
                "requestsIgnored": snapshot.matchmaking.match_requests_ignored,
                "staleQueueEntriesSkipped": snapshot.matchmaking.stale_queue_entries_skipped,
                "sessionsCreated": snapshot.matchmaking.sessions_created,
                "sessionsEnded": snapshot.matchmaking.sessions_ended
            },
            "relay": {
                "signals": snapshot.relay.signals_relayed,
                "chatMessages": snapshot.relay.chat_messages_relayed,
                "typingEvents": snapshot.relay.typing_events_relayed,
                "dropsUnpaired": snapshot.relay.drops_unpaired
            },
            "presenceBroadcasts": snapshot.presence_broadcasts
        }
    });

    Ok(axum::response::Json(response))
}

/// Prometheus metrics endpoint (text format, version 0.0.4)
pub async fn prometheus_metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<RelayServer>>,
) -> axum::response::Result<axum::response::Response> {
    use axum::http::header::{HeaderValue, CONTENT_TYPE};
    use axum::response::IntoResponse;

    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let snapshot = server.metrics().snapshot();
    let body = render_prometheus_metrics(&snapshot);
    let headers = [(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    )];

    Ok((headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerConfig;
    use axum::http::header::AUTHORIZATION;
    use axum::http::HeaderMap;

    fn build_metrics_test_server(mut config: ServerConfig) -> Arc<RelayServer> {
        config.require_metrics_auth = true;
        RelayServer::new(config)
    }

    #[test]
    fn metrics_auth_missing_header_rejected() {
        let server = build_metrics_test_server(ServerConfig::default());
        let headers = HeaderMap::new();
        assert_eq!(
            enforce_metrics_auth(&headers, server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn metrics_auth_accepts_static_token() {
        let config = ServerConfig {
            metrics_auth_token: Some("shared-token".to_string()),
            ..ServerConfig::default()
        };
        let server = build_metrics_test_server(config);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            "Bearer shared-token".parse().expect("header parse failed"),
        );

        assert!(enforce_metrics_auth(&headers, server.as_ref()).is_ok());
    }

    #[test]
    fn metrics_auth_wrong_token_rejected() {
        let config = ServerConfig {
            metrics_auth_token: Some("correct-token".to_string()),
            ..ServerConfig::default()
        };
        let server = build_metrics_test_server(config);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            "Bearer wrong-token".parse().expect("header parse failed"),
        );

        assert_eq!(
            enforce_metrics_auth(&headers, server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn metrics_auth_invalid_scheme_rejected() {
        let config = ServerConfig {
            metrics_auth_token: Some("some-token".to_string()),
            ..ServerConfig::default()
        };
        let server = build_metrics_test_server(config);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            "Basic some-token".parse().expect("header parse failed"),
        );

        assert_eq!(
            enforce_metrics_auth(&headers, server.as_ref()).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}
