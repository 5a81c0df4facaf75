//! The pure render step: snapshot + change set + viewer → what to draw.

use cardroom_protocol::{ParticipantId, Snapshot};

use crate::ChangeSet;

/// What a seat's card slot shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatFace {
    /// No card played.
    Empty,
    /// A card was played but its value is hidden from this viewer.
    FaceDown,
    /// The card value is visible.
    FaceUp(String),
}

/// One participant as drawn in one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub id: ParticipantId,
    pub name: String,
    pub face: SeatFace,
    /// Status icon: has this participant voted?
    pub voted: bool,
    /// The seat belongs to the viewer.
    pub is_viewer: bool,
    pub animate_entry: bool,
    /// Card thrown onto the table (hidden round).
    pub animate_throw: bool,
    /// Card turned face up (revealed round).
    pub animate_flip: bool,
}

impl Seat {
    pub fn is_animated(&self) -> bool {
        self.animate_entry || self.animate_throw || self.animate_flip
    }
}

/// Why the reveal control is (not) available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealHint {
    Ready,
    WaitingForVotes,
    AlreadyRevealed,
}

/// Everything one viewer draws for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub seats: Vec<Seat>,
    pub revealed: bool,
    pub reveal_hint: RevealHint,
    /// The card picker is hidden while votes are showing.
    pub show_card_picker: bool,
    /// Seats to play the exit transition for.
    pub departed: Vec<ParticipantId>,
}

impl RoomView {
    pub fn reveal_enabled(&self) -> bool {
        self.reveal_hint == RevealHint::Ready
    }

    /// Number of seats with a transition to play.
    pub fn animated_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_animated()).count()
    }

    pub fn seat(&self, id: &ParticipantId) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.id == id)
    }
}

/// Computes the view. Pure: the same inputs always draw the same view.
///
/// The viewer's own card is face up as soon as it is played; everyone
/// else's stays face down until the round is revealed.
pub fn render(
    snapshot: &Snapshot,
    changes: &ChangeSet,
    viewer: Option<&ParticipantId>,
) -> RoomView {
    let seats = snapshot
        .participants
        .iter()
        .map(|p| {
            let is_viewer = viewer == Some(&p.id);
            let new_vote = changes.is_new_vote(&p.id);
            let face = if !p.has_voted() {
                SeatFace::Empty
            } else if snapshot.revealed || is_viewer {
                SeatFace::FaceUp(p.card.clone())
            } else {
                SeatFace::FaceDown
            };
            let flips = snapshot.revealed
                && p.has_voted()
                && (changes.newly_revealed || new_vote);

            Seat {
                id: p.id.clone(),
                name: p.name.clone(),
                voted: p.has_voted(),
                is_viewer,
                animate_entry: changes.is_new_participant(&p.id),
                animate_throw: new_vote && !snapshot.revealed,
                animate_flip: flips,
                face,
            }
        })
        .collect();

    let reveal_hint = if snapshot.reveal_eligible() {
        RevealHint::Ready
    } else if snapshot.revealed {
        RevealHint::AlreadyRevealed
    } else {
        RevealHint::WaitingForVotes
    };

    RoomView {
        seats,
        revealed: snapshot.revealed,
        reveal_hint,
        show_card_picker: !snapshot.revealed,
        departed: changes.departed.clone(),
    }
}
