//! WebSocket handler: connection lifecycle and message routing.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use herald_protocol::{ClientFrame, ServerFrame};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::broker::Broker;

/// WebSocket upgrade handler.
///
/// GET /api/ws
///
/// Authentication happened in the middleware; an unauthenticated request
/// never reaches this point.
pub async fn ws_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = user.identity().to_string();
    info!("WebSocket upgrade request from identity {identity}");

    let broker = state.broker.clone();
    ws.on_upgrade(move |socket| handle_connection(socket, broker, identity))
}

/// Drive one connection: forward outbound frames, route inbound ones, and
/// tear everything down when either side goes away.
async fn handle_connection(socket: WebSocket, broker: Arc<Broker>, identity: String) {
    let (mut sender, mut receiver) = socket.split();

    let (mut frame_rx, conn_id) = broker.register_connection(&identity);

    if send_frame(&mut sender, &ServerFrame::welcome(&identity))
        .await
        .is_err()
    {
        warn!("Failed to send welcome frame to identity {identity}");
        broker.connection_closed(&identity, conn_id);
        return;
    }

    loop {
        tokio::select! {
            maybe_frame = frame_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if send_frame(&mut sender, &frame).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // A newer connection for this identity replaced us;
                        // close the stale transport explicitly.
                        info!("Connection for identity {identity} superseded, closing");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            maybe_msg = receiver.next() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        route_frame(&broker, &identity, text.as_str());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary message from identity {identity}");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Identity {identity} closed WebSocket connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for identity {identity}: {e}");
                        break;
                    }
                }
            }
        }
    }

    // Close handler: room membership and the registry entry must not
    // survive past this point (unless a replacement already owns them).
    broker.connection_closed(&identity, conn_id);
    info!("WebSocket connection closed for identity {identity}");
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize outbound frame: {e}");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}

/// Classify one inbound frame and dispatch it.
///
/// Replies go through the broker's outbound channel for the sender. Nothing
/// here is fatal to the connection: malformed frames get an error reply,
/// unrecognized shapes are echoed back.
fn route_frame(broker: &Broker, identity: &str, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!("Unparseable frame from identity {identity}: {e}");
            broker.send_to(identity, ServerFrame::error(format!("Invalid JSON message: {e}")));
            return;
        }
    };

    match serde_json::from_value::<ClientFrame>(value.clone()) {
        Ok(ClientFrame::JoinRoom {
            room_code: Some(code),
        }) => {
            let outcome = broker.join_room(identity, &code);
            broker.send_to(identity, ServerFrame::room_joined(&code, outcome.members));
        }

        Ok(ClientFrame::JoinRoom { room_code: None }) => {
            debug!("join_room from identity {identity} without room_code, ignoring");
        }

        Ok(ClientFrame::Broadcast { room_code, command }) => {
            match broker.broadcast(&room_code, identity, command) {
                Ok(delivered) => {
                    debug!("Identity {identity} broadcast to room {room_code}: {delivered} delivered");
                }
                Err(e) => {
                    broker.send_to(identity, ServerFrame::error(e.to_string()));
                }
            }
        }

        Err(_) => {
            broker.send_to(identity, ServerFrame::unhandled(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_protocol::ServerFrame;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn recv_value(rx: &mut mpsc::Receiver<ServerFrame>) -> Value {
        let frame = rx.try_recv().expect("expected a reply frame");
        serde_json::to_value(&frame).unwrap()
    }

    #[test]
    fn test_malformed_frame_gets_error_reply() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", "this is not json");

        let reply = recv_value(&mut rx);
        let error = reply["error"].as_str().unwrap();
        assert!(error.starts_with("Invalid JSON message"), "got: {error}");
    }

    #[test]
    fn test_unknown_action_is_echoed_back() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", r#"{"action":"dance","tempo":120}"#);

        let reply = recv_value(&mut rx);
        assert_eq!(reply["message"], "Unhandled message type");
        assert_eq!(reply["received"], json!({"action": "dance", "tempo": 120}));
    }

    #[test]
    fn test_non_object_json_is_echoed_back() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", "[1,2,3]");

        let reply = recv_value(&mut rx);
        assert_eq!(reply["message"], "Unhandled message type");
        assert_eq!(reply["received"], json!([1, 2, 3]));
    }

    #[test]
    fn test_join_room_acknowledged() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", r#"{"action":"join_room","room_code":"team1"}"#);

        let reply = recv_value(&mut rx);
        assert_eq!(reply["message"], "Joined room");
        assert_eq!(reply["room"], "team1");
        assert_eq!(reply["members"], 1);
        assert_eq!(broker.current_room("alice").as_deref(), Some("team1"));
    }

    #[test]
    fn test_join_room_without_code_is_ignored() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", r#"{"action":"join_room"}"#);

        assert!(rx.try_recv().is_err());
        assert!(broker.current_room("alice").is_none());
    }

    #[test]
    fn test_broadcast_routes_to_room_members() {
        let broker = Broker::new();
        let (mut alice_rx, _) = broker.register_connection("alice");
        let (mut bob_rx, _) = broker.register_connection("bob");

        route_frame(&broker, "alice", r#"{"action":"join_room","room_code":"team1"}"#);
        route_frame(&broker, "bob", r#"{"action":"join_room","room_code":"team1"}"#);
        let _ = alice_rx.try_recv();
        let _ = bob_rx.try_recv();

        route_frame(
            &broker,
            "alice",
            r#"{"action":"broadcast","room_code":"team1","command":{"cmd":"ping"}}"#,
        );

        assert_eq!(
            recv_value(&mut bob_rx),
            json!({"sender": "alice", "command": {"cmd": "ping"}, "room": "team1"})
        );
        assert!(alice_rx.try_recv().is_err(), "sender must not hear itself");
    }

    #[test]
    fn test_broadcast_without_membership_gets_error_reply() {
        let broker = Broker::new();
        let (mut alice_rx, _) = broker.register_connection("alice");
        let (mut bob_rx, _) = broker.register_connection("bob");
        route_frame(&broker, "bob", r#"{"action":"join_room","room_code":"team1"}"#);
        let _ = bob_rx.try_recv();

        route_frame(
            &broker,
            "alice",
            r#"{"action":"broadcast","room_code":"team1","command":"hi"}"#,
        );

        let reply = recv_value(&mut alice_rx);
        let error = reply["error"].as_str().unwrap();
        assert!(error.contains("not a member of room team1"), "got: {error}");
        assert!(bob_rx.try_recv().is_err(), "no delivery on refusal");
    }

    #[test]
    fn test_broadcast_to_wrong_room_gets_error_reply() {
        let broker = Broker::new();
        let (mut alice_rx, _) = broker.register_connection("alice");
        route_frame(&broker, "alice", r#"{"action":"join_room","room_code":"team2"}"#);
        let _ = alice_rx.try_recv();

        route_frame(
            &broker,
            "alice",
            r#"{"action":"broadcast","room_code":"team1","command":1}"#,
        );

        let reply = recv_value(&mut alice_rx);
        assert!(reply["error"].as_str().unwrap().contains("team1"));
    }

    #[test]
    fn test_broadcast_missing_fields_is_unhandled() {
        let broker = Broker::new();
        let (mut rx, _) = broker.register_connection("alice");

        route_frame(&broker, "alice", r#"{"action":"broadcast","room_code":"team1"}"#);

        let reply = recv_value(&mut rx);
        assert_eq!(reply["message"], "Unhandled message type");
    }
}
