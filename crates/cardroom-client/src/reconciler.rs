//! Snapshot reconciliation: deciding what changed between two snapshots
//! of the same room, from one viewer's point of view.
//!
//! The server keeps no per-viewer history. Every snapshot is the full
//! room, so each viewer remembers what it has already seen and diffs the
//! next snapshot against that memory:
//!
//! - `known_ids`: every participant this view has ever shown. A new id
//!   plays the entry transition once; a participant who leaves and comes
//!   back does not play it again.
//! - `last_card_by_id`: the last vote seen per participant.
//! - `played_this_round`: every (participant, card) pair shown since the
//!   last reset. A non-empty card plays the throw (or flip) transition
//!   only the first time its pair appears, so switching 5 → 8 → 5 animates
//!   the second 5 not at all. A snapshot flagged `just_reset` wipes both
//!   first, so the first vote of the next round animates even if it
//!   repeats the last one.
//!
//! Diffing is pure ([`diff`]); recording is separate
//! ([`VoteHistory::record`]). [`Reconciler`] does both in order.

use std::collections::{HashMap, HashSet};

use cardroom_protocol::{ParticipantId, Snapshot};

use crate::render::{RoomView, render};

// ---------------------------------------------------------------------------
// VoteHistory
// ---------------------------------------------------------------------------

/// What one view has seen of a room so far.
#[derive(Debug, Clone, Default)]
pub struct VoteHistory {
    last_card_by_id: HashMap<ParticipantId, String>,
    played_this_round: HashSet<(ParticipantId, String)>,
    known_ids: HashSet<ParticipantId>,

    /// Participants of the previous snapshot, for departures.
    present: Vec<ParticipantId>,

    /// Whether the previous snapshot was revealed.
    revealed: bool,
}

impl VoteHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this view has ever shown `id`.
    pub fn knows(&self, id: &ParticipantId) -> bool {
        self.known_ids.contains(id)
    }

    /// The last vote seen for `id` in the current round.
    pub fn last_card(&self, id: &ParticipantId) -> Option<&str> {
        self.last_card_by_id.get(id).map(String::as_str)
    }

    /// Whether `card` has already been shown for `id` in the current round.
    pub fn has_played(&self, id: &ParticipantId, card: &str) -> bool {
        self.played_this_round
            .contains(&(id.clone(), card.to_string()))
    }

    /// Folds a snapshot into the history. Call after [`diff`].
    pub fn record(&mut self, snapshot: &Snapshot) {
        if snapshot.just_reset {
            self.last_card_by_id.clear();
            self.played_this_round.clear();
        }
        for p in &snapshot.participants {
            self.known_ids.insert(p.id.clone());
            if p.has_voted() && self.last_card(&p.id) != Some(p.card.as_str()) {
                self.last_card_by_id.insert(p.id.clone(), p.card.clone());
                self.played_this_round.insert((p.id.clone(), p.card.clone()));
            }
        }
        self.present = snapshot.participants.iter().map(|p| p.id.clone()).collect();
        self.revealed = snapshot.revealed;
    }
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// The transitions one snapshot triggers for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// First appearance in this view, in snapshot order.
    pub new_participants: Vec<ParticipantId>,

    /// Non-empty card not yet shown for this participant this round.
    pub new_votes: Vec<ParticipantId>,

    /// In the previous snapshot, gone from this one.
    pub departed: Vec<ParticipantId>,

    /// Revealed now, hidden in the previous snapshot.
    pub newly_revealed: bool,

    /// The snapshot started a new round.
    pub reset: bool,
}

impl ChangeSet {
    pub fn is_new_participant(&self, id: &ParticipantId) -> bool {
        self.new_participants.contains(id)
    }

    pub fn is_new_vote(&self, id: &ParticipantId) -> bool {
        self.new_votes.contains(id)
    }

    /// Nothing for the view to animate.
    pub fn is_empty(&self) -> bool {
        self.new_participants.is_empty()
            && self.new_votes.is_empty()
            && self.departed.is_empty()
            && !self.newly_revealed
            && !self.reset
    }
}

/// Classifies every participant of `snapshot` against `history`.
/// Does not modify the history.
pub fn diff(snapshot: &Snapshot, history: &VoteHistory) -> ChangeSet {
    let mut changes = ChangeSet {
        reset: snapshot.just_reset,
        newly_revealed: snapshot.revealed && !history.revealed,
        ..ChangeSet::default()
    };

    for p in &snapshot.participants {
        if !history.knows(&p.id) {
            changes.new_participants.push(p.id.clone());
        }
        let played = !snapshot.just_reset && history.has_played(&p.id, &p.card);
        if p.has_voted() && !played {
            changes.new_votes.push(p.id.clone());
        }
    }

    changes.departed = history
        .present
        .iter()
        .filter(|id| snapshot.participant(id).is_none())
        .cloned()
        .collect();

    changes
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// One viewer's reconciler for one room.
///
/// Feed it snapshots strictly in arrival order.
#[derive(Debug, Clone)]
pub struct Reconciler {
    viewer: Option<ParticipantId>,
    history: VoteHistory,
}

impl Reconciler {
    /// `viewer` is the participant this view belongs to; `None` for a
    /// spectator who sees nobody's hidden card.
    pub fn new(viewer: Option<ParticipantId>) -> Self {
        Self {
            viewer,
            history: VoteHistory::new(),
        }
    }

    pub fn viewer(&self) -> Option<&ParticipantId> {
        self.viewer.as_ref()
    }

    pub fn set_viewer(&mut self, viewer: ParticipantId) {
        self.viewer = Some(viewer);
    }

    pub fn history(&self) -> &VoteHistory {
        &self.history
    }

    /// Diffs `snapshot` against the history, then records it.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> ChangeSet {
        let changes = diff(snapshot, &self.history);
        self.history.record(snapshot);
        changes
    }

    /// Reconciles and renders in one step.
    pub fn observe(&mut self, snapshot: &Snapshot) -> RoomView {
        let changes = self.reconcile(snapshot);
        render(snapshot, &changes, self.viewer.as_ref())
    }
}
