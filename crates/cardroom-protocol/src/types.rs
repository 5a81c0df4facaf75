//! Core protocol types: identifiers, inbound messages, and snapshots.
//!
//! Everything here is what travels "inside" a frame. The inbound side is
//! split in two: [`InboundMessage`] is the loose JSON shape clients send
//! (every field optional except `type`), and [`InboundEvent`] is the
//! validated tagged union the room actor consumes. Converting one into the
//! other is the only place required-field rules live.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a room.
///
/// Room ids come from the page URL, so they are arbitrary strings rather
/// than server-issued numbers. `#[serde(transparent)]` keeps the JSON a
/// plain string: `"sprint-12"`, not `{"0":"sprint-12"}`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identifier of a participant, fixed for a connection's lifetime.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Inbound: client → server
// ---------------------------------------------------------------------------

/// The `type` discriminator of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Join,
    Leave,
    CardPlayed,
    Reveal,
    Reset,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::CardPlayed => "CARD_PLAYED",
            Self::Reveal => "REVEAL",
            Self::Reset => "RESET",
        };
        f.write_str(name)
    }
}

/// An inbound message exactly as it appears on the wire.
///
/// ```json
/// {"type":"CARD_PLAYED","roomId":"r1","playerId":"p1","card":"5"}
/// ```
///
/// Fields a given `type` does not use are ignored. Use
/// [`into_event`](Self::into_event) to validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Which operation this message requests.
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Target room.
    #[serde(default)]
    pub room_id: String,

    /// The acting participant. Unused by `REVEAL` and `RESET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,

    /// Display name, required for `JOIN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,

    /// Card value, required for `CARD_PLAYED` (empty string unplays).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
}

impl InboundMessage {
    fn bare(kind: MessageType, room_id: &RoomId) -> Self {
        Self {
            kind,
            room_id: room_id.0.clone(),
            player_id: None,
            player_name: None,
            card: None,
        }
    }

    /// Builds a `JOIN` message.
    pub fn join(room_id: &RoomId, player_id: &ParticipantId, name: &str) -> Self {
        Self {
            player_id: Some(player_id.0.clone()),
            player_name: Some(name.to_string()),
            ..Self::bare(MessageType::Join, room_id)
        }
    }

    /// Builds a `JOIN` message without a `playerId`; the server picks one
    /// and answers with `ASSIGNED`.
    pub fn join_unassigned(room_id: &RoomId, name: &str) -> Self {
        Self {
            player_name: Some(name.to_string()),
            ..Self::bare(MessageType::Join, room_id)
        }
    }

    /// Builds a `LEAVE` message.
    pub fn leave(room_id: &RoomId, player_id: &ParticipantId) -> Self {
        Self {
            player_id: Some(player_id.0.clone()),
            ..Self::bare(MessageType::Leave, room_id)
        }
    }

    /// Builds a `CARD_PLAYED` message.
    pub fn card_played(
        room_id: &RoomId,
        player_id: &ParticipantId,
        card: &str,
    ) -> Self {
        Self {
            player_id: Some(player_id.0.clone()),
            card: Some(card.to_string()),
            ..Self::bare(MessageType::CardPlayed, room_id)
        }
    }

    /// Builds a `REVEAL` message.
    pub fn reveal(room_id: &RoomId) -> Self {
        Self::bare(MessageType::Reveal, room_id)
    }

    /// Builds a `RESET` message.
    pub fn reset(room_id: &RoomId) -> Self {
        Self::bare(MessageType::Reset, room_id)
    }

    /// Returns `true` for a `JOIN` that carries no usable `playerId`.
    ///
    /// The server assigns an id to such joins before validating them.
    pub fn needs_player_id(&self) -> bool {
        self.kind == MessageType::Join
            && self.player_id.as_deref().is_none_or(str::is_empty)
    }

    /// Validates the message and converts it into an [`InboundEvent`].
    ///
    /// # Errors
    /// - [`ProtocolError::MissingField`] when `roomId` is empty, when
    ///   `playerId` is missing or empty for `JOIN`/`LEAVE`/`CARD_PLAYED`,
    ///   when `playerName` is missing or blank for `JOIN`, or when `card`
    ///   is absent for `CARD_PLAYED`.
    pub fn into_event(self) -> Result<InboundEvent, ProtocolError> {
        let kind = self.kind;
        let missing = |field| ProtocolError::MissingField { kind, field };

        if self.room_id.is_empty() {
            return Err(missing("roomId"));
        }
        let room_id = RoomId(self.room_id);
        let player = self
            .player_id
            .filter(|id| !id.is_empty())
            .map(ParticipantId);

        let event = match kind {
            MessageType::Join => {
                let name = self
                    .player_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .ok_or(missing("playerName"))?;
                InboundEvent::Join {
                    room_id,
                    participant_id: player.ok_or(missing("playerId"))?,
                    name,
                }
            }
            MessageType::Leave => InboundEvent::Leave {
                room_id,
                participant_id: player.ok_or(missing("playerId"))?,
            },
            MessageType::CardPlayed => InboundEvent::CardPlayed {
                room_id,
                participant_id: player.ok_or(missing("playerId"))?,
                card: self.card.ok_or(missing("card"))?,
            },
            MessageType::Reveal => InboundEvent::Reveal { room_id },
            MessageType::Reset => InboundEvent::Reset { room_id },
        };
        Ok(event)
    }
}

/// A validated inbound event, ready to be applied by a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Add a participant (or rename one already present).
    Join {
        room_id: RoomId,
        participant_id: ParticipantId,
        name: String,
    },
    /// Remove a participant.
    Leave {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Set a participant's card; an empty card withdraws the vote.
    CardPlayed {
        room_id: RoomId,
        participant_id: ParticipantId,
        card: String,
    },
    /// Expose every vote, if everyone has voted.
    Reveal { room_id: RoomId },
    /// Clear every vote and hide the table again.
    Reset { room_id: RoomId },
}

impl InboundEvent {
    /// The room this event targets.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Join { room_id, .. }
            | Self::Leave { room_id, .. }
            | Self::CardPlayed { room_id, .. }
            | Self::Reveal { room_id }
            | Self::Reset { room_id } => room_id,
        }
    }

    /// The acting participant, for events that have one.
    pub fn participant_id(&self) -> Option<&ParticipantId> {
        match self {
            Self::Join { participant_id, .. }
            | Self::Leave { participant_id, .. }
            | Self::CardPlayed { participant_id, .. } => Some(participant_id),
            Self::Reveal { .. } | Self::Reset { .. } => None,
        }
    }

    /// The wire type this event was parsed from.
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Join { .. } => MessageType::Join,
            Self::Leave { .. } => MessageType::Leave,
            Self::CardPlayed { .. } => MessageType::CardPlayed,
            Self::Reveal { .. } => MessageType::Reveal,
            Self::Reset { .. } => MessageType::Reset,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound: server → subscribers
// ---------------------------------------------------------------------------

/// One participant as shown in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub name: String,
    /// The played card, or `""` if this participant has not voted.
    #[serde(default)]
    pub card: String,
}

impl ParticipantView {
    /// Returns `true` once this participant has played a card.
    pub fn has_voted(&self) -> bool {
        !self.card.is_empty()
    }
}

/// The full state of one room, broadcast after every event.
///
/// ```json
/// {"players":[{"id":"p1","name":"Alice","card":"5"}],"revealed":false,"reset":false}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Participants in join order.
    #[serde(rename = "players")]
    pub participants: Vec<ParticipantView>,

    /// Whether votes are currently exposed.
    pub revealed: bool,

    /// Set only on the snapshot that directly follows a reset; tells
    /// receivers to forget which votes they have already animated.
    #[serde(rename = "reset", default)]
    pub just_reset: bool,
}

impl Snapshot {
    /// Non-empty room where every participant has a card.
    pub fn all_voted(&self) -> bool {
        !self.participants.is_empty()
            && self.participants.iter().all(ParticipantView::has_voted)
    }

    /// Whether a reveal would currently be accepted.
    pub fn reveal_eligible(&self) -> bool {
        !self.revealed && self.all_voted()
    }

    /// Looks up a participant by id.
    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| &p.id == id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what browser clients read and write, so
    //! most of these tests pin the exact field names.

    use super::*;

    fn parse(json: &str) -> InboundMessage {
        serde_json::from_str(json).expect("should parse")
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("r1")).unwrap();
        assert_eq!(json, "\"r1\"");
        assert_eq!(RoomId::from("r1").to_string(), "r1");
    }

    #[test]
    fn test_participant_id_deserializes_from_plain_string() {
        let id: ParticipantId = serde_json::from_str("\"p-9\"").unwrap();
        assert_eq!(id, ParticipantId::from("p-9"));
    }

    // =====================================================================
    // InboundMessage → InboundEvent
    // =====================================================================

    #[test]
    fn test_join_parses_into_event() {
        let msg = parse(
            r#"{"type":"JOIN","roomId":"r1","playerId":"p1","playerName":"Alice"}"#,
        );
        assert_eq!(
            msg.into_event().unwrap(),
            InboundEvent::Join {
                room_id: "r1".into(),
                participant_id: "p1".into(),
                name: "Alice".into(),
            }
        );
    }

    #[test]
    fn test_join_trims_name() {
        let msg = parse(
            r#"{"type":"JOIN","roomId":"r1","playerId":"p1","playerName":"  Bob "}"#,
        );
        match msg.into_event().unwrap() {
            InboundEvent::Join { name, .. } => assert_eq!(name, "Bob"),
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn test_join_without_name_is_missing_field() {
        let msg = parse(r#"{"type":"JOIN","roomId":"r1","playerId":"p1"}"#);
        assert!(matches!(
            msg.into_event(),
            Err(ProtocolError::MissingField { field: "playerName", .. })
        ));
    }

    #[test]
    fn test_join_blank_name_is_missing_field() {
        let msg = parse(
            r#"{"type":"JOIN","roomId":"r1","playerId":"p1","playerName":"   "}"#,
        );
        assert!(matches!(
            msg.into_event(),
            Err(ProtocolError::MissingField { field: "playerName", .. })
        ));
    }

    #[test]
    fn test_join_without_player_id_needs_assignment() {
        let msg = parse(r#"{"type":"JOIN","roomId":"r1","playerName":"A"}"#);
        assert!(msg.needs_player_id());
        assert!(matches!(
            msg.into_event(),
            Err(ProtocolError::MissingField { field: "playerId", .. })
        ));

        let msg = parse(
            r#"{"type":"JOIN","roomId":"r1","playerId":"","playerName":"A"}"#,
        );
        assert!(msg.needs_player_id());
    }

    #[test]
    fn test_join_unassigned_omits_player_id_on_the_wire() {
        let msg = InboundMessage::join_unassigned(&"r1".into(), "Alice");
        assert!(msg.needs_player_id());
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "JOIN", "roomId": "r1", "playerName": "Alice"})
        );
    }

    #[test]
    fn test_card_played_requires_card_but_allows_empty() {
        let missing =
            parse(r#"{"type":"CARD_PLAYED","roomId":"r1","playerId":"p1"}"#);
        assert!(matches!(
            missing.into_event(),
            Err(ProtocolError::MissingField { field: "card", .. })
        ));

        let unplay = parse(
            r#"{"type":"CARD_PLAYED","roomId":"r1","playerId":"p1","card":""}"#,
        );
        assert_eq!(
            unplay.into_event().unwrap(),
            InboundEvent::CardPlayed {
                room_id: "r1".into(),
                participant_id: "p1".into(),
                card: String::new(),
            }
        );
    }

    #[test]
    fn test_reveal_ignores_extra_fields() {
        let msg = parse(
            r#"{"type":"REVEAL","roomId":"r1","playerId":"p1","card":"5"}"#,
        );
        assert_eq!(
            msg.into_event().unwrap(),
            InboundEvent::Reveal { room_id: "r1".into() }
        );
    }

    #[test]
    fn test_empty_room_id_is_rejected() {
        let msg = parse(r#"{"type":"RESET","roomId":""}"#);
        assert!(matches!(
            msg.into_event(),
            Err(ProtocolError::MissingField { field: "roomId", .. })
        ));
    }

    #[test]
    fn test_leave_requires_player_id() {
        let msg = parse(r#"{"type":"LEAVE","roomId":"r1"}"#);
        assert!(msg.into_event().is_err());
    }

    #[test]
    fn test_unknown_type_fails_to_parse() {
        let result: Result<InboundMessage, _> =
            serde_json::from_str(r#"{"type":"UPDATE","roomId":"r1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_builders_serialize_camel_case_and_skip_absent_fields() {
        let msg = InboundMessage::card_played(
            &"r1".into(),
            &"p1".into(),
            "13",
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "CARD_PLAYED");
        assert_eq!(json["roomId"], "r1");
        assert_eq!(json["playerId"], "p1");
        assert_eq!(json["card"], "13");
        assert!(json.get("playerName").is_none());
    }

    #[test]
    fn test_event_accessors() {
        let event = InboundEvent::Leave {
            room_id: "r1".into(),
            participant_id: "p2".into(),
        };
        assert_eq!(event.room_id().as_str(), "r1");
        assert_eq!(event.participant_id().map(ParticipantId::as_str), Some("p2"));
        assert_eq!(event.kind(), MessageType::Leave);
        assert_eq!(
            InboundEvent::Reset { room_id: "r1".into() }.participant_id(),
            None
        );
    }

    // =====================================================================
    // Snapshot
    // =====================================================================

    fn view(id: &str, name: &str, card: &str) -> ParticipantView {
        ParticipantView {
            id: id.into(),
            name: name.into(),
            card: card.into(),
        }
    }

    #[test]
    fn test_snapshot_json_format() {
        let snap = Snapshot {
            participants: vec![view("p1", "Alice", ""), view("p2", "Bob", "8")],
            revealed: false,
            just_reset: true,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "players": [
                    {"id": "p1", "name": "Alice", "card": ""},
                    {"id": "p2", "name": "Bob", "card": "8"}
                ],
                "revealed": false,
                "reset": true
            })
        );
    }

    #[test]
    fn test_snapshot_all_voted_requires_non_empty_room() {
        assert!(!Snapshot::default().all_voted());
        assert!(!Snapshot::default().reveal_eligible());
    }

    #[test]
    fn test_snapshot_reveal_eligibility() {
        let mut snap = Snapshot {
            participants: vec![view("p1", "Alice", "5"), view("p2", "Bob", "")],
            ..Snapshot::default()
        };
        assert!(!snap.reveal_eligible());

        snap.participants[1].card = "?".into();
        assert!(snap.all_voted());
        assert!(snap.reveal_eligible());

        snap.revealed = true;
        assert!(!snap.reveal_eligible());
    }
}
