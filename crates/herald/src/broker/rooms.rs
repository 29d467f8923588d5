//! Room directory: ephemeral, code-addressed broadcast groups.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use log::{debug, info};

/// Result of a join: which room was left (if any) and the new member count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub left: Option<String>,
    pub members: usize,
}

#[derive(Default)]
struct RoomState {
    /// Room code -> member identities. A room with zero members is deleted.
    rooms: HashMap<String, HashSet<String>>,
    /// Identity -> room code it currently occupies.
    occupancy: HashMap<String, String>,
}

impl RoomState {
    fn remove_member(&mut self, identity: &str, room_code: &str) {
        if let Some(members) = self.rooms.get_mut(room_code) {
            members.remove(identity);
            if members.is_empty() {
                self.rooms.remove(room_code);
                debug!("Deleted empty room {room_code}");
            }
        }
    }
}

/// Directory of rooms keyed by room code.
///
/// A single mutex guards membership and occupancy together, so every
/// join/leave is one atomic transition: no caller can observe an identity
/// belonging to zero or two rooms mid-switch.
pub struct RoomDirectory {
    inner: Mutex<RoomState>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RoomState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RoomState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move an identity into a room, creating the room on first join.
    ///
    /// Leaves any prior room in the same critical section. Re-joining the
    /// current room is a no-op apart from the returned member count.
    pub fn join(&self, identity: &str, room_code: &str) -> JoinOutcome {
        let mut state = self.lock();

        let left = match state.occupancy.get(identity) {
            Some(current) if current == room_code => None,
            Some(current) => {
                let current = current.clone();
                state.remove_member(identity, &current);
                Some(current)
            }
            None => None,
        };

        state
            .rooms
            .entry(room_code.to_string())
            .or_default()
            .insert(identity.to_string());
        state
            .occupancy
            .insert(identity.to_string(), room_code.to_string());

        let members = state.rooms[room_code].len();
        info!("Identity {identity} joined room {room_code} ({members} members)");

        JoinOutcome { left, members }
    }

    /// Remove an identity from its current room, deleting the room if it
    /// becomes empty. Returns the room left, or `None` if roomless.
    pub fn leave(&self, identity: &str) -> Option<String> {
        let mut state = self.lock();
        let room_code = state.occupancy.remove(identity)?;
        state.remove_member(identity, &room_code);
        info!("Identity {identity} left room {room_code}");
        Some(room_code)
    }

    /// The room an identity currently occupies.
    pub fn current_room(&self, identity: &str) -> Option<String> {
        self.lock().occupancy.get(identity).cloned()
    }

    /// Consistent snapshot of a room's membership, sorted so iteration order
    /// is deterministic within a call. `None` if the room does not exist.
    pub fn members(&self, room_code: &str) -> Option<Vec<String>> {
        let state = self.lock();
        let members = state.rooms.get(room_code)?;
        let mut snapshot: Vec<String> = members.iter().cloned().collect();
        snapshot.sort();
        Some(snapshot)
    }

    /// Room code -> member count, for diagnostics.
    pub fn overview(&self) -> BTreeMap<String, usize> {
        self.lock()
            .rooms
            .iter()
            .map(|(code, members)| (code.clone(), members.len()))
            .collect()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.lock().rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rooms.is_empty()
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}
