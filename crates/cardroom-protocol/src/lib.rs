//! Wire protocol for Cardroom.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Messages** ([`InboundMessage`], [`InboundEvent`], [`Snapshot`]):
//!   the planning-poker payloads.
//! - **Frames** ([`ClientFrame`], [`ServerFrame`]): the pub/sub layer
//!   that carries those payloads over one connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes ↔ frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (frames, events) → Room (state machine)
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{ClientFrame, ServerFrame};
pub use types::{
    InboundEvent, InboundMessage, MessageType, ParticipantId,
    ParticipantView, RoomId, Snapshot,
};
