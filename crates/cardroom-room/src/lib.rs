//! Room state and per-room serialization for Cardroom.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! participant list and votes, applies inbound events one at a time and
//! publishes a snapshot after every one of them.
//!
//! # Key types
//!
//! - [`Room`]: the voting state machine (plain struct, no I/O)
//! - [`RoomRegistry`]: creates rooms on first join, routes events
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Publisher`] / [`TopicPublisher`]: snapshot fan-out per room topic
//! - [`RoomConfig`]: idle timeout and subscriber buffer size

mod actor;
mod config;
mod error;
mod publisher;
mod registry;
mod room;

pub use actor::RoomHandle;
pub use config::RoomConfig;
pub use error::RoomError;
pub use publisher::{Publisher, TopicPublisher};
pub use registry::RoomRegistry;
pub use room::{IgnoreReason, Outcome, Room};
