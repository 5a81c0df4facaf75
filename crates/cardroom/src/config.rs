//! Server-level settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and sweep timing for a [`CardroomServer`](crate::CardroomServer).
///
/// Room and presence settings live in `RoomConfig` and `SessionConfig`;
/// the builder takes all three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// A connection that sends no frame for this long is closed. Clients
    /// heartbeat every 10 seconds. Default: 30 seconds.
    pub idle_timeout: Duration,

    /// How often disconnected presences are checked against their grace
    /// period. Default: 5 seconds.
    pub presence_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            presence_sweep_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.presence_sweep_interval, Duration::from_secs(5));
    }
}
