//! Error types for the protocol layer.
//!
//! Each Cardroom crate defines its own error enum, so a `ProtocolError`
//! always means "these bytes or this message are not something we can
//! act on" and never a networking or room problem.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` or
    /// `frame` tag, or a field with the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A message parsed fine but lacks a field its `type` requires,
    /// e.g. a `JOIN` without `playerName`.
    #[error("missing required field `{field}` for {kind}")]
    MissingField {
        /// The message type that was being validated.
        kind: crate::MessageType,
        /// The wire name of the absent field.
        field: &'static str,
    },

    /// The message is invalid for some other protocol-level reason.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
