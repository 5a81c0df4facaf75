//! Error types for the client.

use cardroom_protocol::ProtocolError;

/// Errors a [`RoomClient`](crate::RoomClient) can hit.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting, sending or receiving on the WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded, or the server sent one we cannot
    /// decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
}
