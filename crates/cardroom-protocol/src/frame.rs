//! The pub/sub frame layer carried over each connection.
//!
//! Clients publish every inbound message to one send destination and
//! subscribe to a per-room topic keyed by room id. Frames are internally
//! tagged by `"frame"`, so a send looks like:
//!
//! ```json
//! {"frame":"SEND","body":{"type":"REVEAL","roomId":"r1"}}
//! ```
//!
//! and a broadcast like:
//!
//! ```json
//! {"frame":"MESSAGE","topic":"r1","body":{"players":[],"revealed":false,"reset":false}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{InboundMessage, ParticipantId, RoomId, Snapshot};

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Start receiving snapshots for a room. Subscribing before sending
    /// `JOIN` guarantees the join's own broadcast is delivered.
    Subscribe { topic: RoomId },

    /// Stop receiving snapshots for a room.
    Unsubscribe { topic: RoomId },

    /// Publish an inbound message to the room send destination.
    Send { body: InboundMessage },

    /// Keep-alive. Any frame resets the server's idle timer; this one
    /// also gets an answer.
    #[serde(rename_all = "camelCase")]
    Heartbeat { client_time: u64 },

    /// "I'm going away." The server closes the connection.
    Disconnect { reason: String },
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// Acknowledges a `SUBSCRIBE`.
    Subscribed { topic: RoomId },

    /// A room snapshot published on `topic`.
    Message { topic: RoomId, body: Snapshot },

    /// Sent only to the joining connection when its `JOIN` had no
    /// `playerId`: the id the server picked for it in room `topic`.
    Assigned {
        topic: RoomId,
        #[serde(rename = "playerId")]
        participant_id: ParticipantId,
    },

    /// Answer to a heartbeat. `server_time` is milliseconds since the
    /// connection was accepted.
    #[serde(rename_all = "camelCase")]
    HeartbeatAck { client_time: u64, server_time: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageType, ParticipantView};

    #[test]
    fn test_subscribe_json_format() {
        let frame = ClientFrame::Subscribe { topic: "r1".into() };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, serde_json::json!({"frame": "SUBSCRIBE", "topic": "r1"}));
    }

    #[test]
    fn test_send_frame_parses_nested_message() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"frame":"SEND","body":{"type":"JOIN","roomId":"r1","playerId":"p1","playerName":"Alice"}}"#,
        )
        .unwrap();
        match frame {
            ClientFrame::Send { body } => {
                assert_eq!(body.kind, MessageType::Join);
                assert_eq!(body.player_name.as_deref(), Some("Alice"));
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn test_send_frame_with_malformed_body_fails() {
        let result: Result<ClientFrame, _> = serde_json::from_str(
            r#"{"frame":"SEND","body":{"type":"FLY","roomId":"r1"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_heartbeat_uses_camel_case_fields() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"frame":"HEARTBEAT","clientTime":42}"#)
                .unwrap();
        assert_eq!(frame, ClientFrame::Heartbeat { client_time: 42 });

        let ack = ServerFrame::HeartbeatAck {
            client_time: 42,
            server_time: 7,
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["frame"], "HEARTBEAT_ACK");
        assert_eq!(json["clientTime"], 42);
        assert_eq!(json["serverTime"], 7);
    }

    #[test]
    fn test_message_frame_carries_snapshot() {
        let frame = ServerFrame::Message {
            topic: "r1".into(),
            body: Snapshot {
                participants: vec![ParticipantView {
                    id: "p1".into(),
                    name: "Alice".into(),
                    card: String::new(),
                }],
                revealed: false,
                just_reset: false,
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["frame"], "MESSAGE");
        assert_eq!(json["topic"], "r1");
        assert_eq!(json["body"]["players"][0]["name"], "Alice");
        assert_eq!(json["body"]["reset"], false);
    }

    #[test]
    fn test_assigned_uses_player_id_on_the_wire() {
        let frame = ServerFrame::Assigned {
            topic: "r1".into(),
            participant_id: "player-00ff".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"frame": "ASSIGNED", "topic": "r1", "playerId": "player-00ff"})
        );
    }

    #[test]
    fn test_unknown_frame_tag_fails() {
        let result: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"frame":"CONNECT"}"#);
        assert!(result.is_err());
    }
}
