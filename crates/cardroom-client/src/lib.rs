//! Client side of Cardroom.
//!
//! Every participant's view receives the same full snapshots. What it
//! animates depends on what that view has already seen, so each view
//! runs its own [`Reconciler`]:
//!
//! ```text
//! Snapshot ──diff──→ ChangeSet ──render──→ RoomView ──settle_delay──→ drawn
//!    │                  ↑
//!    └────record───→ VoteHistory
//! ```
//!
//! [`RoomClient`] drives all of this over a WebSocket connection.

mod client;
mod error;
mod reconciler;
mod render;
mod timing;

pub use client::RoomClient;
pub use error::ClientError;
pub use reconciler::{ChangeSet, Reconciler, VoteHistory, diff};
pub use render::{RevealHint, RoomView, Seat, SeatFace, render};
pub use timing::TransitionTiming;
