//! Unified error type for Cardroom.

use cardroom_protocol::ProtocolError;
use cardroom_room::RoomError;
use cardroom_session::SessionError;
use cardroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically. None of these ever reach a client: they end
/// one connection (or are logged and skipped) on the server side.
#[derive(Debug, thiserror::Error)]
pub enum CardroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A presence lookup failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room could not be reached.
    #[error(transparent)]
    Room(#[from] RoomError),
}
