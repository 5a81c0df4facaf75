//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room actor a registry spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// A room that applies no event for this long is retired, whoever is
    /// still listed in it. Catches participants abandoned without any
    /// traffic at all.
    pub idle_ttl: Duration,

    /// Per-subscriber snapshot buffer. A subscriber that falls this many
    /// snapshots behind loses the oldest ones and resumes with the newest.
    pub snapshot_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            snapshot_buffer: 32,
        }
    }
}
