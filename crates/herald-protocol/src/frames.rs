//! Client and server frame definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent from a connected client (web client or agent) to the broker.
///
/// Classification is keyed on the `action` discriminant. A JSON object whose
/// `action` is unknown, or whose required fields are missing, fails to decode
/// and is echoed back by the broker as an unhandled-message diagnostic.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a room, leaving the current one if any.
    ///
    /// A `join_room` without a `room_code` is silently ignored.
    JoinRoom {
        #[serde(default)]
        room_code: Option<String>,
    },

    /// Broadcast a command to every other member of a room.
    Broadcast { room_code: String, command: Value },
}

/// Frames sent from the broker to a connected client.
///
/// Serialize-only by design: the broadcast envelope and the reply frames have
/// fixed shapes without a shared discriminant, and direct-dispatch commands
/// pass through as raw JSON. Clients parse inbound text as plain JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Greeting sent once, right after a connection is registered.
    Welcome { message: String, identity: String },

    /// Acknowledgment for a successful room join.
    RoomJoined {
        message: String,
        room: String,
        members: usize,
    },

    /// Room broadcast envelope: `{"sender":...,"command":...,"room":...}`.
    Broadcast {
        sender: String,
        command: Value,
        room: String,
    },

    /// Echo for a well-formed frame the broker does not understand.
    Unhandled { message: String, received: Value },

    /// Error reply. The connection stays open.
    Error { error: String },

    /// A command pushed through the direct-dispatch seam, forwarded verbatim.
    Raw(Value),
}

impl ServerFrame {
    /// Greeting frame for a freshly registered identity.
    pub fn welcome(identity: impl Into<String>) -> Self {
        Self::Welcome {
            message: "Connected to Herald relay".to_string(),
            identity: identity.into(),
        }
    }

    /// Join acknowledgment.
    pub fn room_joined(room: impl Into<String>, members: usize) -> Self {
        Self::RoomJoined {
            message: "Joined room".to_string(),
            room: room.into(),
            members,
        }
    }

    /// Unhandled-message echo carrying the original payload.
    pub fn unhandled(received: Value) -> Self {
        Self::Unhandled {
            message: "Unhandled message type".to_string(),
            received,
        }
    }

    /// Error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// Outcome of a best-effort send to a single identity.
///
/// Never an error: a missing or dead connection is an expected state the
/// caller surfaces however it sees fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// The frame was handed to a live transport.
    Delivered,
    /// No live connection for the target identity.
    NotConnected,
}

impl Delivery {
    /// Whether the frame was handed off.
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_room_decodes() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"action":"join_room","room_code":"team1"}"#).unwrap();
        match frame {
            ClientFrame::JoinRoom { room_code } => assert_eq!(room_code.as_deref(), Some("team1")),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_join_room_without_code_decodes_as_none() {
        let frame: ClientFrame = serde_json::from_str(r#"{"action":"join_room"}"#).unwrap();
        match frame {
            ClientFrame::JoinRoom { room_code } => assert!(room_code.is_none()),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_requires_all_fields() {
        let ok = serde_json::from_str::<ClientFrame>(
            r#"{"action":"broadcast","room_code":"team1","command":{"cmd":"ping"}}"#,
        );
        assert!(ok.is_ok());

        let missing_command =
            serde_json::from_str::<ClientFrame>(r#"{"action":"broadcast","room_code":"team1"}"#);
        assert!(missing_command.is_err());
    }

    #[test]
    fn test_unknown_action_fails_to_decode() {
        let err = serde_json::from_str::<ClientFrame>(r#"{"action":"self_destruct"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_broadcast_envelope_shape() {
        let frame = ServerFrame::Broadcast {
            sender: "alice".to_string(),
            command: json!({"cmd": "ping"}),
            room: "team1".to_string(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({"sender": "alice", "command": {"cmd": "ping"}, "room": "team1"})
        );
    }

    #[test]
    fn test_unhandled_echo_wraps_original() {
        let original = json!({"action": "dance", "tempo": 120});
        let value = serde_json::to_value(ServerFrame::unhandled(original.clone())).unwrap();
        assert_eq!(value["message"], "Unhandled message type");
        assert_eq!(value["received"], original);
    }

    #[test]
    fn test_raw_frame_passes_through() {
        let command = json!({"application": "browser", "action": "open"});
        let value = serde_json::to_value(ServerFrame::Raw(command.clone())).unwrap();
        assert_eq!(value, command);
    }

    #[test]
    fn test_delivery_is_delivered() {
        assert!(Delivery::Delivered.is_delivered());
        assert!(!Delivery::NotConnected.is_delivered());
    }
}
