//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The server and client never call `serde_json` directly; they go through
//! a [`Codec`]. That keeps the wire format swappable in one place and
//! gives every caller the same [`ProtocolError`] on failure.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients speak JSON natively, so this is the only codec the
/// server ships with. It is behind the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use cardroom_protocol::{ClientFrame, Codec, InboundMessage, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
///
/// let frame = ClientFrame::Send {
///     body: InboundMessage::reveal(&RoomId::from("sprint-12")),
/// };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ClientFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientFrame, ServerFrame};

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<ClientFrame, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encode_produces_utf8() {
        // The WebSocket transport sends UTF-8 payloads as text frames,
        // which is what browser clients expect for JSON.
        let frame = ServerFrame::Subscribed {
            topic: "r1".into(),
        };
        let bytes = JsonCodec.encode(&frame).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }
}
