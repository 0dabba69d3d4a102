//! Session registry
//!
//! Maps each identified connection to its [`Session`] and keeps a reverse
//! index from destination to subscribed connections. Both maps live behind a
//! single lock so the index is always the exact inverse of the sessions'
//! subscription sets.
//!
//! Mutations report [`InterestChange`]s: a destination gaining its first
//! local subscriber or losing its last one. The gateway uses these to
//! subscribe or unsubscribe upstream on demand.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use relay_core::{Destination, DomainError, Principal};

use super::{ConnectionId, Session};

/// Change in local interest for a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestChange {
    /// First local subscriber appeared
    Gained(Destination),
    /// Last local subscriber went away
    Lost(Destination),
}

impl InterestChange {
    pub fn destination(&self) -> &Destination {
        match self {
            Self::Gained(d) | Self::Lost(d) => d,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: HashMap<ConnectionId, Session>,
    subscribers: HashMap<Destination, HashSet<ConnectionId>>,
}

impl RegistryInner {
    /// Add `id` to the index bucket; true if the bucket was empty
    fn index_add(&mut self, destination: &Destination, id: ConnectionId) -> bool {
        let bucket = self.subscribers.entry(destination.clone()).or_default();
        let was_empty = bucket.is_empty();
        bucket.insert(id);
        was_empty
    }

    /// Remove `id` from the index bucket; true if the bucket became empty
    fn index_remove(&mut self, destination: &Destination, id: ConnectionId) -> bool {
        let Some(bucket) = self.subscribers.get_mut(destination) else {
            return false;
        };
        if !bucket.remove(&id) {
            return false;
        }
        if bucket.is_empty() {
            self.subscribers.remove(destination);
            return true;
        }
        false
    }

    /// Drop a session and all its index entries
    fn remove_session(&mut self, id: ConnectionId) -> Option<(Session, Vec<InterestChange>)> {
        let session = self.sessions.remove(&id)?;
        let lost = session
            .subscriptions
            .iter()
            .filter(|destination| self.index_remove(destination, id))
            .cloned()
            .map(InterestChange::Lost)
            .collect();
        Some((session, lost))
    }
}

/// Thread-safe registry of live sessions and their subscriptions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for a newly identified connection
    ///
    /// A duplicate ID is an invariant violation: it is logged and the stale
    /// session is replaced, dropping its subscriptions.
    pub fn on_connect(&self, id: ConnectionId, principal: Principal) -> Vec<InterestChange> {
        let mut inner = self.inner.write();

        let lost = match inner.remove_session(id) {
            Some((stale, lost)) => {
                let error = DomainError::DuplicateConnection(id.to_string());
                tracing::error!(
                    connection_id = %id,
                    stale_principal = %stale.principal,
                    principal = %principal,
                    error = %error,
                    "Replacing stale session"
                );
                lost
            }
            None => Vec::new(),
        };

        tracing::debug!(connection_id = %id, principal = %principal, "Session registered");
        inner.sessions.insert(id, Session::new(id, principal));
        lost
    }

    /// Subscribe a connection to a destination
    ///
    /// Idempotent. Returns `Gained` when this is the first local subscriber.
    /// Unknown connections are ignored.
    pub fn on_subscribe(&self, id: ConnectionId, destination: Destination) -> Option<InterestChange> {
        let mut inner = self.inner.write();

        let Some(session) = inner.sessions.get_mut(&id) else {
            tracing::warn!(connection_id = %id, destination = %destination, "Subscribe for unknown connection");
            return None;
        };
        if !session.subscriptions.insert(destination.clone()) {
            return None;
        }

        tracing::debug!(connection_id = %id, destination = %destination, "Subscribed");
        inner
            .index_add(&destination, id)
            .then_some(InterestChange::Gained(destination))
    }

    /// Unsubscribe a connection from a destination
    ///
    /// No-op when not subscribed. Returns `Lost` when this was the last local
    /// subscriber.
    pub fn on_unsubscribe(&self, id: ConnectionId, destination: &Destination) -> Option<InterestChange> {
        let mut inner = self.inner.write();

        let session = inner.sessions.get_mut(&id)?;
        if !session.subscriptions.remove(destination) {
            return None;
        }

        tracing::debug!(connection_id = %id, destination = %destination, "Unsubscribed");
        inner
            .index_remove(destination, id)
            .then(|| InterestChange::Lost(destination.clone()))
    }

    /// Remove a connection's session and every subscription it held
    ///
    /// A second call for the same connection is a no-op.
    pub fn on_disconnect(&self, id: ConnectionId) -> Vec<InterestChange> {
        let mut inner = self.inner.write();

        match inner.remove_session(id) {
            Some((session, lost)) => {
                tracing::debug!(
                    connection_id = %id,
                    principal = %session.principal,
                    subscriptions = session.subscriptions.len(),
                    "Session removed"
                );
                lost
            }
            None => Vec::new(),
        }
    }

    /// Connections subscribed to a destination
    pub fn subscribers_of(&self, destination: &Destination) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .subscribers
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Check if any local connection subscribes to a destination
    pub fn has_subscribers(&self, destination: &Destination) -> bool {
        self.inner.read().subscribers.contains_key(destination)
    }

    /// Snapshot of one session
    pub fn session(&self, id: ConnectionId) -> Option<Session> {
        self.inner.read().sessions.get(&id).cloned()
    }

    /// Snapshots of every session of a user
    pub fn sessions_of(&self, username: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .inner
            .read()
            .sessions
            .values()
            .filter(|s| s.principal.name() == username)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.connected_at);
        sessions
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }

    /// Number of destinations with at least one subscriber
    pub fn destination_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }

    /// Distinct usernames with a live session, sorted
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .inner
            .read()
            .sessions
            .values()
            .map(|s| s.principal.name().to_string())
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Check that the reverse index is exactly the inverse of the sessions
    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let inner = self.inner.read();

        let mut expected: HashMap<Destination, HashSet<ConnectionId>> = HashMap::new();
        for session in inner.sessions.values() {
            for destination in &session.subscriptions {
                expected
                    .entry(destination.clone())
                    .or_default()
                    .insert(session.connection_id);
            }
        }

        expected == inner.subscribers
    }
}
