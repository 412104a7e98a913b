//! Matchmaking configuration types.

use super::defaults::default_waiting_status;
use serde::{Deserialize, Serialize};

/// Matchmaking configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchmakingConfig {
    /// Status text sent with the `waiting` event
    #[serde(default = "default_waiting_status")]
    pub waiting_status: String,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            waiting_status: default_waiting_status(),
        }
    }
}
