//! Configuration module for the relay server.
//!
//! This module provides configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`matchmaking`]: Matchmaking behavior configuration
//! - [`security`]: Security settings (CORS, limits, metrics auth)
//! - [`logging`]: Logging configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod matchmaking;
pub mod security;
pub mod types;
pub mod validation;
pub mod websocket;

// Re-exports for convenience
pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use matchmaking::MatchmakingConfig;

pub use security::SecurityConfig;

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

pub use websocket::WebSocketConfig;
