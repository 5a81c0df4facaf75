//! Error types for the session layer.

use crate::PresenceKey;

/// Errors that can occur during presence management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No presence exists for this participant in this room.
    /// Happens when a `LEAVE` arrives for someone who already left or
    /// whose presence was already expired.
    #[error("no presence for {0}")]
    NotFound(PresenceKey),
}
