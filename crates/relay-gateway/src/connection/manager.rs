//! Connection manager
//!
//! Holds the socket handle of every live connection, identified or not,
//! using `DashMap` for concurrent access.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{Connection, ConnectionId, Outbound};
use crate::protocol::GatewayMessage;

/// Result of pushing a frame to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// Outbound channel at capacity; frame dropped
    Full,
    /// Connection gone
    Closed,
}

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<Connection>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(&self, id: ConnectionId, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let connection = Connection::new(id, sender);
        self.connections.insert(id, connection.clone());

        tracing::debug!(connection_id = %id, "Connection added");

        connection
    }

    /// Remove a connection
    pub fn remove_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(&id).map(|(_, c)| c);
        if removed.is_some() {
            tracing::debug!(connection_id = %id, "Connection removed");
        }
        removed
    }

    /// Get a connection by ID
    pub fn get_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|r| r.clone())
    }

    /// Push a frame without waiting
    ///
    /// `build` receives the connection so it can stamp a per-connection
    /// sequence number. It is not called when the frame is dropped.
    pub fn push(&self, id: ConnectionId, build: impl FnOnce(&Connection) -> GatewayMessage) -> PushOutcome {
        let Some(connection) = self.get_connection(id) else {
            return PushOutcome::Closed;
        };

        match connection.try_send_with(build) {
            Ok(()) => PushOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => PushOutcome::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }

    /// Get the total number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .finish()
    }
}
