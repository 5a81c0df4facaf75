//! # Cardroom
//!
//! Real-time planning poker rooms over WebSocket.
//!
//! Participants join a room, play a card face down, and once everyone has
//! voted any of them can reveal the cards together. The server owns the
//! room state; every change is broadcast to the room topic as a full
//! snapshot, so clients only ever render what they receive.
//!
//! ```text
//! Transport (bytes) → Protocol (frames, events) → Session (presence) → Room (actor)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardroom::prelude::*;
//!
//! # async fn start() -> Result<(), CardroomError> {
//! let server = CardroomServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::CardroomError;
pub use server::{CardroomServer, CardroomServerBuilder};

pub use cardroom_protocol as protocol;
pub use cardroom_room as room;
pub use cardroom_session as session;
pub use cardroom_transport as transport;

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{CardroomError, CardroomServer, CardroomServerBuilder, ServerConfig};
    pub use cardroom_protocol::{
        ClientFrame, InboundEvent, InboundMessage, MessageType, ParticipantId,
        ParticipantView, RoomId, ServerFrame, Snapshot,
    };
    pub use cardroom_room::{Publisher, RoomConfig, RoomRegistry, TopicPublisher};
    pub use cardroom_session::SessionConfig;
}
