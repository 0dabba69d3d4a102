//! Session entity
//!
//! One session per identified connection, owned by the [`SessionRegistry`].
//!
//! [`SessionRegistry`]: super::SessionRegistry

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use relay_core::{Destination, Principal};
use serde::Serialize;
use uuid::Uuid;

/// Opaque identifier of a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random connection ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// An identified connection and the destinations it subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub principal: Principal,
    pub subscriptions: BTreeSet<Destination>,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with no subscriptions
    pub fn new(connection_id: ConnectionId, principal: Principal) -> Self {
        Self {
            connection_id,
            principal,
            subscriptions: BTreeSet::new(),
            connected_at: Utc::now(),
        }
    }

    /// Check if the session subscribes to a destination
    pub fn is_subscribed_to(&self, destination: &Destination) -> bool {
        self.subscriptions.contains(destination)
    }
}
