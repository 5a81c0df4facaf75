//! Participant presence for Cardroom.
//!
//! Rooms know participants only through events. This crate tracks which
//! connection is responsible for which seat so that a connection dropping
//! without a `LEAVE` still, eventually, frees the seat:
//!
//! 1. **Attach**: a `JOIN` ties the seat to the sending connection.
//! 2. **Grace**: a dropped connection leaves its seats `Disconnected`,
//!    and re-joining with the same id within the grace period restores
//!    them ([`SessionConfig::reconnect_grace_secs`]).
//! 3. **Expiry**: seats past the grace period are reported by
//!    [`SessionManager::expire_stale`]; the server turns those into
//!    `LEAVE` events.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← asks which seats a closing connection held
//!     ↕
//! Session Layer (this crate)  ← seat ownership and grace periods
//!     ↕
//! Protocol / Transport (below)  ← RoomId, ParticipantId, ConnectionId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::{SessionManager, generate_participant_id};
pub use session::{Presence, PresenceKey, PresenceState, SessionConfig};
