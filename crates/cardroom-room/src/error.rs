//! Error types for the room layer.

use cardroom_protocol::RoomId;

/// Errors that can occur while routing events to rooms.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is running under this id. Only a `JOIN` creates rooms, so
    /// any other event for an unseen id ends here.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's actor has stopped (retired or shut down) and can no
    /// longer take commands.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
