//! Presence types: the server's record that a connection speaks for a
//! participant in a room.
//!
//! A presence tracks:
//! - WHO (`PresenceKey`: room + participant)
//! - THROUGH WHICH connection (`owner`)
//! - WHETHER that connection is still there (`PresenceState`)

use std::fmt;

use cardroom_protocol::{ParticipantId, RoomId};
use cardroom_transport::ConnectionId;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for presence expiry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a participant whose connection dropped
    /// without a `LEAVE` stays in the room before being removed.
    ///
    /// Re-joining with the same participant id inside this window keeps
    /// the seat (and the vote). Default: 30 seconds.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// PresenceKey
// ---------------------------------------------------------------------------

/// Identifies one seat: a participant id within one room.
///
/// The same participant id may sit in several rooms (one browser, two
/// tabs), so the room is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenceKey {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

impl PresenceKey {
    /// Builds a key from its parts.
    pub fn new(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            room_id,
            participant_id,
        }
    }
}

impl fmt::Display for PresenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.participant_id, self.room_id)
    }
}

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// Liveness of a presence.
///
/// ```text
///   Connected ──(connection lost)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                                  │
///       └──────────(JOIN again)────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    /// The owning connection is open.
    Connected,

    /// The owning connection went away without a `LEAVE` at `since`.
    Disconnected { since: Instant },

    /// Grace period elapsed; the participant is due to be removed.
    Expired,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// One participant seat and the connection currently responsible for it.
#[derive(Debug, Clone)]
pub struct Presence {
    pub key: PresenceKey,

    /// The connection that most recently sent `JOIN` for this seat.
    pub owner: ConnectionId,

    pub state: PresenceState,
}
