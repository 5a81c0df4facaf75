//! Room state: who is in one room, what they voted, and whether the
//! votes are showing.
//!
//! `Room` is a plain struct with synchronous transitions. It knows
//! nothing about tasks, channels or subscribers; the actor owns one and
//! feeds it events one at a time.
//!
//! ```text
//!                 CardPlayed (everyone)
//!   [hidden] ────────────────────────────→ [hidden, all voted]
//!      ↑                                           │ Reveal
//!      │ Reset                                     ▼
//!      └────────────────────────────────────── [revealed]
//! ```

use std::collections::HashSet;
use std::fmt;

use cardroom_protocol::{
    InboundEvent, ParticipantId, ParticipantView, RoomId, Snapshot,
};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What applying one event did to the room.
///
/// Outcomes are for logs only. Clients get the next snapshot either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event changed (or re-asserted) room state.
    Applied,
    /// The event was a no-op.
    Ignored(IgnoreReason),
}

/// Why an event was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `LEAVE` or `CARD_PLAYED` for someone not in the room.
    UnknownParticipant,
    /// `CARD_PLAYED` or `REVEAL` while the votes are already showing.
    AlreadyRevealed,
    /// `REVEAL` before every participant has a card (or in an empty room).
    NotAllVoted,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParticipant => write!(f, "unknown participant"),
            Self::AlreadyRevealed => write!(f, "already revealed"),
            Self::NotAllVoted => write!(f, "not everyone has voted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Participant {
    id: ParticipantId,
    name: String,
    card: String,
}

/// The authoritative state of one room.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,

    /// Join order. Rooms hold a handful of people, so lookups scan.
    participants: Vec<Participant>,

    revealed: bool,

    /// Set by `Reset`, cleared by the next [`take_snapshot`](Self::take_snapshot).
    just_reset: bool,
}

impl Room {
    /// Creates an empty, unrevealed room.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            participants: Vec::new(),
            revealed: false,
            just_reset: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Non-empty room where every participant has a card.
    pub fn all_voted(&self) -> bool {
        !self.participants.is_empty()
            && self.participants.iter().all(|p| !p.card.is_empty())
    }

    /// Applies one event.
    ///
    /// | Event | Effect | No-op when |
    /// |---|---|---|
    /// | Join | append with empty card; rename if already present | never |
    /// | Leave | remove | not present |
    /// | CardPlayed | set card (`""` withdraws) | revealed, or not present |
    /// | Reveal | show votes | revealed, or not all voted |
    /// | Reset | clear cards, hide, flag next snapshot | never |
    ///
    /// The event's room id is not checked; routing is the registry's job.
    pub fn apply(&mut self, event: &InboundEvent) -> Outcome {
        match event {
            InboundEvent::Join {
                participant_id,
                name,
                ..
            } => {
                match self.position(participant_id) {
                    Some(i) => self.participants[i].name.clone_from(name),
                    None => self.participants.push(Participant {
                        id: participant_id.clone(),
                        name: name.clone(),
                        card: String::new(),
                    }),
                }
                Outcome::Applied
            }

            InboundEvent::Leave { participant_id, .. } => {
                match self.position(participant_id) {
                    Some(i) => {
                        // `remove`, not `swap_remove`: join order is visible.
                        self.participants.remove(i);
                        Outcome::Applied
                    }
                    None => Outcome::Ignored(IgnoreReason::UnknownParticipant),
                }
            }

            InboundEvent::CardPlayed {
                participant_id,
                card,
                ..
            } => {
                if self.revealed {
                    return Outcome::Ignored(IgnoreReason::AlreadyRevealed);
                }
                match self.position(participant_id) {
                    Some(i) => {
                        self.participants[i].card.clone_from(card);
                        Outcome::Applied
                    }
                    None => Outcome::Ignored(IgnoreReason::UnknownParticipant),
                }
            }

            InboundEvent::Reveal { .. } => {
                if self.revealed {
                    Outcome::Ignored(IgnoreReason::AlreadyRevealed)
                } else if !self.all_voted() {
                    Outcome::Ignored(IgnoreReason::NotAllVoted)
                } else {
                    self.revealed = true;
                    Outcome::Applied
                }
            }

            InboundEvent::Reset { .. } => {
                for p in &mut self.participants {
                    p.card.clear();
                }
                self.revealed = false;
                self.just_reset = true;
                Outcome::Applied
            }
        }
    }

    /// The current state, without consuming the reset flag.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    card: p.card.clone(),
                })
                .collect(),
            revealed: self.revealed,
            just_reset: self.just_reset,
        }
    }

    /// The snapshot to broadcast after an event. Consumes the reset flag,
    /// so only the first snapshot after a `Reset` carries it.
    pub fn take_snapshot(&mut self) -> Snapshot {
        let snapshot = self.snapshot();
        self.just_reset = false;
        snapshot
    }

    /// Checks the structural invariants a room must hold between events.
    ///
    /// # Errors
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.participants.len());
        for p in &self.participants {
            if p.id.as_str().is_empty() {
                return Err("participant with empty id".to_string());
            }
            if !seen.insert(&p.id) {
                return Err(format!("duplicate participant {}", p.id));
            }
        }
        if self.revealed && self.just_reset {
            return Err("reset flag set while revealed".to_string());
        }
        Ok(())
    }

    fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| &p.id == id)
    }
}
