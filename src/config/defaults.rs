//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    10000
}

// =============================================================================
// Matchmaking Defaults
// =============================================================================

pub fn default_waiting_status() -> String {
    "Looking for a partner...".to_string()
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_require_auth() -> bool {
    false
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB, enough for any SDP blob
}

pub const fn default_max_connections_per_ip() -> usize {
    16
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_send_queue_capacity() -> usize {
    64
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
