//! Connection registry: the live mapping from user id to that user's
//! WebSocket connections.
//!
//! A user can have multiple concurrent connections (multiple devices/tabs).
//! A reverse index (connection id -> user id) makes unregister O(1) instead
//! of a scan over every user's set.

use std::collections::HashMap;

use dashmap::DashMap;

use super::{ConnectionId, ConnectionSender};

/// Single source of truth for which live connections belong to which user.
///
/// Constructed once at startup and shared via `AppState`. All operations are
/// synchronous and hold at most one shard guard at a time, so they are safe
/// to call from any task; nothing here is held across an await point.
#[derive(Default)]
pub struct ConnectionRegistry {
    /// user id -> (connection id -> outbound sender)
    users: DashMap<String, HashMap<ConnectionId, ConnectionSender>>,
    /// connection id -> user id
    index: DashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a user's set, creating the set if absent.
    ///
    /// A connection belongs to at most one user: if the connection id is
    /// already registered under a different user, it is moved — removed from
    /// the prior user's set (pruning it if emptied) before being inserted
    /// under the new one. A socket authenticates as exactly one user.
    pub fn register(&self, user_id: &str, connection_id: ConnectionId, sender: ConnectionSender) {
        if user_id.is_empty() {
            return;
        }

        if let Some(prev_user) = self.index.insert(connection_id, user_id.to_string()) {
            if prev_user != user_id {
                self.detach(&prev_user, connection_id);
            }
        }

        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(connection_id, sender);

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            connections = self.connection_count(user_id),
            "Connection registered"
        );
    }

    /// Remove a connection from whatever user's set it belongs to.
    /// If this empties the set, the user's key is deleted entirely.
    /// No-op for ids that were never registered (idempotent).
    pub fn unregister(&self, connection_id: ConnectionId) {
        let Some((_, user_id)) = self.index.remove(&connection_id) else {
            return;
        };

        self.detach(&user_id, connection_id);

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Connection unregistered"
        );
    }

    /// Snapshot of the connection ids currently registered for a user.
    /// Empty when the user has no live authenticated connections.
    pub fn connections_for(&self, user_id: &str) -> Vec<ConnectionId> {
        self.users
            .get(user_id)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the outbound senders for a user's connections.
    /// Cloned out of the map so no guard is held while callers send.
    pub fn senders_for(&self, user_id: &str) -> Vec<ConnectionSender> {
        self.users
            .get(user_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live connections for a user.
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.users.get(user_id).map(|set| set.len()).unwrap_or(0)
    }

    /// Remove a connection from one user's set and prune the set if emptied.
    /// The mutable guard is dropped before `remove_if` re-locks the entry.
    fn detach(&self, user_id: &str, connection_id: ConnectionId) {
        if let Some(mut set) = self.users.get_mut(user_id) {
            set.remove(&connection_id);
        }
        self.users.remove_if(user_id, |_, set| set.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn sender() -> ConnectionSender {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    #[test]
    fn connections_for_returns_exactly_the_registered_set() {
        let registry = ConnectionRegistry::new();
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        registry.register("user-1", a, sender());
        registry.register("user-1", b, sender());
        registry.register("user-2", c, sender());

        let set: HashSet<_> = registry.connections_for("user-1").into_iter().collect();
        assert_eq!(set, HashSet::from([a, b]));
        assert_eq!(registry.connections_for("user-2"), vec![c]);
        assert!(!set.contains(&c));
    }

    #[test]
    fn unknown_user_yields_empty_snapshot() {
        let registry = ConnectionRegistry::new();
        assert!(registry.connections_for("nobody").is_empty());
        assert!(registry.senders_for("nobody").is_empty());
        assert_eq!(registry.connection_count("nobody"), 0);
    }

    #[test]
    fn last_unregister_prunes_the_user_key() {
        let registry = ConnectionRegistry::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());

        registry.register("user-1", a, sender());
        registry.register("user-1", b, sender());
        registry.unregister(a);
        assert_eq!(registry.connections_for("user-1"), vec![b]);
        assert!(registry.users.contains_key("user-1"));

        registry.unregister(b);
        assert!(registry.connections_for("user-1").is_empty());
        // No dangling empty-set entry.
        assert!(!registry.users.contains_key("user-1"));
        assert!(!registry.index.contains_key(&b));
    }

    #[test]
    fn double_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::now_v7();

        registry.register("user-1", a, sender());
        registry.unregister(a);
        registry.unregister(a);
        assert!(registry.connections_for("user-1").is_empty());

        // Unregister of a never-registered id is also a no-op.
        registry.unregister(Uuid::now_v7());
    }

    #[test]
    fn reauthenticate_moves_the_connection() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::now_v7();

        registry.register("user-1", a, sender());
        registry.register("user-2", a, sender());

        assert!(registry.connections_for("user-1").is_empty());
        assert!(!registry.users.contains_key("user-1"));
        assert_eq!(registry.connections_for("user-2"), vec![a]);
        assert_eq!(registry.index.get(&a).unwrap().value(), "user-2");
    }

    #[test]
    fn reregister_under_same_user_keeps_one_membership() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::now_v7();

        registry.register("user-1", a, sender());
        registry.register("user-1", a, sender());
        assert_eq!(registry.connections_for("user-1"), vec![a]);
    }

    #[test]
    fn empty_user_id_is_rejected() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::now_v7();

        registry.register("", a, sender());
        assert!(!registry.index.contains_key(&a));
        assert!(registry.users.is_empty());
    }
}
