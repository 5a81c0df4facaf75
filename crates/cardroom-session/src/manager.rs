//! The session manager: which connection speaks for which seat.
//!
//! Rooms only learn about participants through events, so when a browser
//! tab is killed nobody sends `LEAVE` and the participant would sit in
//! the room forever, blocking "all voted". The manager closes that gap:
//!
//! - a `JOIN` attaches the seat to the sending connection,
//! - an explicit `LEAVE` releases it,
//! - a connection closing marks its remaining seats disconnected,
//! - seats disconnected longer than the grace period expire, and the
//!   server turns each expiry into a `LEAVE`.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain struct over `HashMap`s. The server wraps it
//! in a `tokio::sync::Mutex`; none of its methods await.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use cardroom_protocol::{ParticipantId, RoomId};
use cardroom_transport::ConnectionId;
use rand::Rng;
use tokio::time::Instant;

use crate::{Presence, PresenceKey, PresenceState, SessionConfig, SessionError};

/// Tracks every participant seat held by a live or recently lost
/// connection.
///
/// ```text
/// attach() ──→ [Connected] ──disconnect()──→ [Disconnected]
///                  ↑                              │
///                  └──────────attach()────────────┤
///                                                 ▼ expire_stale()
///                                             [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    presences: HashMap<PresenceKey, Presence>,

    /// Reverse index so a closing connection finds its seats without a
    /// full scan. Kept in sync with `presences`.
    by_connection: HashMap<ConnectionId, HashSet<PresenceKey>>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            presences: HashMap::new(),
            by_connection: HashMap::new(),
            config,
        }
    }

    /// Attaches a seat to `owner` after it sent `JOIN`.
    ///
    /// Re-attaching a seat held by another connection moves it (a page
    /// reload opens a new socket and re-joins with the stored id). A
    /// disconnected seat becomes connected again.
    pub fn attach(
        &mut self,
        owner: ConnectionId,
        room_id: RoomId,
        participant_id: ParticipantId,
    ) -> &Presence {
        let key = PresenceKey::new(room_id, participant_id);

        if let Some(previous) = self.presences.remove(&key) {
            self.unindex(previous.owner, &key);
            match previous.state {
                PresenceState::Disconnected { .. } => {
                    tracing::info!(%key, %owner, "presence restored");
                }
                _ if previous.owner != owner => {
                    tracing::debug!(
                        %key,
                        from = %previous.owner,
                        to = %owner,
                        "presence moved to new connection"
                    );
                }
                _ => {}
            }
        }

        self.by_connection
            .entry(owner)
            .or_default()
            .insert(key.clone());
        self.presences
            .entry(key.clone())
            .insert_entry(Presence {
                key,
                owner,
                state: PresenceState::Connected,
            })
            .into_mut()
    }

    /// Forgets a seat after an explicit `LEAVE`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the seat is not tracked.
    pub fn release(
        &mut self,
        key: &PresenceKey,
    ) -> Result<Presence, SessionError> {
        let presence = self
            .presences
            .remove(key)
            .ok_or_else(|| SessionError::NotFound(key.clone()))?;
        self.unindex(presence.owner, key);
        Ok(presence)
    }

    /// Marks every seat owned by `owner` as disconnected and starts their
    /// grace period. Returns the affected seats.
    pub fn disconnect(&mut self, owner: ConnectionId) -> Vec<PresenceKey> {
        let Some(keys) = self.by_connection.remove(&owner) else {
            return Vec::new();
        };

        let now = Instant::now();
        let mut affected: Vec<PresenceKey> = keys.into_iter().collect();
        affected.sort();
        for key in &affected {
            if let Some(presence) = self.presences.get_mut(key) {
                presence.state = PresenceState::Disconnected { since: now };
            }
        }

        if !affected.is_empty() {
            tracing::info!(
                %owner,
                seats = affected.len(),
                "connection lost, grace period started"
            );
        }
        affected
    }

    /// Expires every disconnected seat whose grace period has elapsed.
    ///
    /// Returns the expired seats; the caller removes those participants
    /// from their rooms, then calls [`cleanup_expired`](Self::cleanup_expired).
    pub fn expire_stale(&mut self) -> Vec<PresenceKey> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for presence in self.presences.values_mut() {
            if let PresenceState::Disconnected { since } = presence.state {
                if since.elapsed() >= grace {
                    presence.state = PresenceState::Expired;
                    tracing::info!(
                        key = %presence.key,
                        "presence expired (grace period elapsed)"
                    );
                    expired.push(presence.key.clone());
                }
            }
        }

        expired.sort();
        expired
    }

    /// Removes all expired seats.
    pub fn cleanup_expired(&mut self) {
        self.presences
            .retain(|_, p| !matches!(p.state, PresenceState::Expired));
    }

    /// Looks up a seat.
    pub fn get(&self, key: &PresenceKey) -> Option<&Presence> {
        self.presences.get(key)
    }

    /// Seats currently attached to `owner`.
    pub fn owned_by(&self, owner: ConnectionId) -> Vec<PresenceKey> {
        let mut keys: Vec<PresenceKey> = self
            .by_connection
            .get(&owner)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Returns the number of tracked seats (any state).
    pub fn len(&self) -> usize {
        self.presences.len()
    }

    /// Returns `true` if no seats are tracked.
    pub fn is_empty(&self) -> bool {
        self.presences.is_empty()
    }

    fn unindex(&mut self, owner: ConnectionId, key: &PresenceKey) {
        if let Some(keys) = self.by_connection.get_mut(&owner) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_connection.remove(&owner);
            }
        }
    }
}

/// Generates an id for a participant who joined without one:
/// `"player-"` followed by 16 lowercase hex characters (64 random bits).
pub fn generate_participant_id() -> ParticipantId {
    let bytes: [u8; 8] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    ParticipantId(format!("player-{hex}"))
}

// =========================================================================
// Tests
// =========================================================================
