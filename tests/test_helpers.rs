use std::sync::Arc;
use voicelink_server::server::{RelayServer, ServerConfig};

/// Create a test server for integration tests
#[allow(dead_code)]
pub fn create_test_server() -> Arc<RelayServer> {
    RelayServer::new(test_server_config())
}

/// Default server configuration optimized for testing
#[allow(dead_code)]
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        max_message_size: 65536,
        max_connections_per_ip: 100, // Generous for tests
        require_metrics_auth: false, // No auth for tests
        metrics_auth_token: None,
        waiting_status: "Looking for a partner...".to_string(),
        send_queue_capacity: 64,
    }
}
