//! Root configuration types.

use super::defaults::default_port;
use super::logging::LoggingConfig;
use super::matchmaking::MatchmakingConfig;
use super::security::SecurityConfig;
use super::websocket::WebSocketConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct for the relay server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            matchmaking: MatchmakingConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            websocket: WebSocketConfig::default(),
        }
    }
}
