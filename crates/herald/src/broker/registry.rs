//! Connection registry: one live transport per identity.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use herald_protocol::{Delivery, ServerFrame};
use log::{debug, info, warn};
use tokio::sync::mpsc;

/// Size of the per-connection outbound buffer.
const CONNECTION_BUFFER_SIZE: usize = 64;

/// Identifies one registration of an identity.
///
/// Re-authentication replaces the registry entry; the id lets a stale close
/// handler recognize that its entry is gone and leave the replacement alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(u64);

struct ConnectionEntry {
    id: ConnectionId,
    tx: mpsc::Sender<ServerFrame>,
}

/// Registry of live connections, keyed by identity.
///
/// Holds at most one entry per identity. Registering an identity that is
/// already connected replaces the old entry (last-writer-wins); dropping the
/// old sender closes its channel, which the old connection task observes and
/// answers by closing its socket.
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionEntry>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection for an identity.
    ///
    /// Returns the receiving end of the outbound channel and the id of this
    /// registration.
    pub fn register(&self, identity: &str) -> (mpsc::Receiver<ServerFrame>, ConnectionId) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let previous = self
            .connections
            .insert(identity.to_string(), ConnectionEntry { id, tx });

        if previous.is_some() {
            // The replaced sender is dropped here, closing the stale transport's
            // outbound channel.
            warn!("Replacing existing connection for identity {identity}");
        } else {
            info!("Registered connection for identity {identity}");
        }

        (rx, id)
    }

    /// Remove the entry for an identity if it still belongs to `id`.
    ///
    /// Idempotent: unknown identities and already-replaced entries are no-ops.
    /// Returns whether an entry was removed.
    pub fn unregister(&self, identity: &str, id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(identity, |_, entry| entry.id == id)
            .is_some();
        if removed {
            info!("Unregistered connection for identity {identity}");
        }
        removed
    }

    /// Hand a frame to an identity's transport, fire-and-forget.
    ///
    /// Never blocks: a missing entry, a closed channel, or a full buffer all
    /// yield [`Delivery::NotConnected`].
    pub fn send_to(&self, identity: &str, frame: ServerFrame) -> Delivery {
        let Some(entry) = self.connections.get(identity) else {
            return Delivery::NotConnected;
        };

        match entry.tx.try_send(frame) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                debug!("Dropping frame for identity {identity}: {e}");
                Delivery::NotConnected
            }
        }
    }

    /// Whether an identity currently has a live entry.
    pub fn is_connected(&self, identity: &str) -> bool {
        self.connections.contains_key(identity)
    }

    /// Snapshot of all connected identities, for diagnostics.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_send() {
        let registry = ConnectionRegistry::new();
        let (mut rx, _id) = registry.register("alice");

        let outcome = registry.send_to("alice", ServerFrame::Raw(json!({"cmd": "ping"})));
        assert_eq!(outcome, Delivery::Delivered);

        let frame = rx.try_recv().unwrap();
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"cmd": "ping"})
        );
    }

    #[test]
    fn test_send_to_unknown_identity() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            registry.send_to("ghost", ServerFrame::error("hello")),
            Delivery::NotConnected
        );
    }

    #[test]
    fn test_reregistration_closes_previous_channel() {
        let registry = ConnectionRegistry::new();
        let (mut old_rx, old_id) = registry.register("alice");
        let (mut new_rx, _new_id) = registry.register("alice");

        // The stale channel is closed, so its task will tear down the socket.
        assert!(matches!(
            old_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        // Sends reach only the replacement.
        registry.send_to("alice", ServerFrame::Raw(json!(1)));
        assert!(new_rx.try_recv().is_ok());

        // The stale close handler must not remove the replacement.
        assert!(!registry.unregister("alice", old_id));
        assert!(registry.is_connected("alice"));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (_rx, id) = registry.register("alice");

        assert!(registry.unregister("alice", id));
        assert!(!registry.unregister("alice", id));
        assert!(!registry.unregister("never-seen", id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_send_after_unregister_is_not_connected() {
        let registry = ConnectionRegistry::new();
        let (_rx, id) = registry.register("alice");
        registry.unregister("alice", id);

        assert_eq!(
            registry.send_to("alice", ServerFrame::error("late")),
            Delivery::NotConnected
        );
    }

    #[test]
    fn test_identities_snapshot_is_sorted() {
        let registry = ConnectionRegistry::new();
        let (_rx_b, _) = registry.register("bob");
        let (_rx_a, _) = registry.register("alice");

        assert_eq!(registry.identities(), vec!["alice", "bob"]);
    }
}
