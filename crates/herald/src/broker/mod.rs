//! Connection broker: the one stateful component of the relay.
//!
//! The broker owns two internally-synchronized collections — identity to
//! connection, room code to member set — constructed once per server
//! instance and shared through [`crate::api::AppState`]. Everything else in
//! the server is per-request.

mod registry;
mod rooms;

use herald_protocol::{Delivery, ServerFrame};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use registry::{ConnectionId, ConnectionRegistry};
pub use rooms::{JoinOutcome, RoomDirectory};

/// Broadcast failures surfaced to the sender as an error reply.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The sender is not currently a member of the target room.
    #[error("identity {identity} is not a member of room {room}")]
    NotAMember { identity: String, room: String },
}

/// Read-only snapshot of broker state, for the diagnostic sweep.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerStats {
    pub connections: usize,
    pub rooms: usize,
}

/// The connection broker facade.
pub struct Broker {
    registry: ConnectionRegistry,
    rooms: RoomDirectory,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomDirectory::new(),
        }
    }

    /// Register a freshly authenticated connection.
    ///
    /// Any prior connection for the identity is evicted: its outbound channel
    /// closes and its task shuts the stale socket down. Room membership is
    /// keyed by identity and survives the replacement.
    pub fn register_connection(
        &self,
        identity: &str,
    ) -> (mpsc::Receiver<ServerFrame>, ConnectionId) {
        self.registry.register(identity)
    }

    /// Tear down state for a closed connection: leave the current room and
    /// drop the registry entry.
    ///
    /// Both steps are skipped when `id` no longer owns the registry entry —
    /// a stale close arriving after re-registration must not disturb the
    /// replacement connection.
    pub fn connection_closed(&self, identity: &str, id: ConnectionId) {
        if self.registry.unregister(identity, id) {
            self.rooms.leave(identity);
        } else {
            debug!("Ignoring close for superseded connection of {identity}");
        }
    }

    /// Move an identity into a room (leaving its previous one atomically).
    pub fn join_room(&self, identity: &str, room_code: &str) -> JoinOutcome {
        self.rooms.join(identity, room_code)
    }

    /// The room an identity currently occupies.
    pub fn current_room(&self, identity: &str) -> Option<String> {
        self.rooms.current_room(identity)
    }

    /// Broadcast a command to every member of a room except the sender.
    ///
    /// Requires the sender to currently occupy the room. Delivery is
    /// best-effort: members without a live connection are skipped silently.
    /// Returns the number of members the payload was handed to.
    pub fn broadcast(
        &self,
        room_code: &str,
        sender: &str,
        command: Value,
    ) -> Result<usize, BroadcastError> {
        if self.rooms.current_room(sender).as_deref() != Some(room_code) {
            return Err(BroadcastError::NotAMember {
                identity: sender.to_string(),
                room: room_code.to_string(),
            });
        }

        // Membership snapshot taken under the directory lock; joins and
        // leaves during the fan-out cannot corrupt this iteration.
        let members = self.rooms.members(room_code).unwrap_or_default();

        let mut delivered = 0;
        for member in members.iter().filter(|m| m.as_str() != sender) {
            let frame = ServerFrame::Broadcast {
                sender: sender.to_string(),
                command: command.clone(),
                room: room_code.to_string(),
            };
            if self.registry.send_to(member, frame).is_delivered() {
                delivered += 1;
            }
        }

        debug!(
            "Broadcast from {sender} to room {room_code}: {delivered}/{} delivered",
            members.len().saturating_sub(1)
        );
        Ok(delivered)
    }

    /// Push a structured command straight to one identity's connection,
    /// bypassing rooms. The command's shape is not validated here.
    ///
    /// This is the seam the HTTP command path consumes.
    pub fn dispatch_to_identity(&self, identity: &str, command: Value) -> Delivery {
        self.registry.send_to(identity, ServerFrame::Raw(command))
    }

    /// Hand a reply frame to an identity's own transport.
    pub fn send_to(&self, identity: &str, frame: ServerFrame) -> Delivery {
        self.registry.send_to(identity, frame)
    }

    /// Connected identities, for diagnostics.
    pub fn identities(&self) -> Vec<String> {
        self.registry.identities()
    }

    /// Room code -> member count, for diagnostics.
    pub fn room_overview(&self) -> std::collections::BTreeMap<String, usize> {
        self.rooms.overview()
    }

    /// Counts snapshot for the periodic diagnostic sweep.
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            connections: self.registry.len(),
            rooms: self.rooms.len(),
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
