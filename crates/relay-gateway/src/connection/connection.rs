//! Individual WebSocket connection
//!
//! The socket-side handle of a connection: its principal once identified,
//! its outbound channel, sequence counter, and liveness clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_core::Principal;
use tokio::sync::mpsc;

use super::ConnectionId;
use crate::protocol::{CloseCode, GatewayMessage};

/// Item on a connection's outbound channel
#[derive(Debug, Clone)]
pub enum Outbound {
    Frame(GatewayMessage),
    /// Send a close frame and stop writing
    Close(CloseCode),
}

/// A single WebSocket connection
pub struct Connection {
    id: ConnectionId,

    /// Set once by Identify
    principal: OnceLock<Principal>,

    /// Channel to the socket writer task
    sender: mpsc::Sender<Outbound>,

    /// Last dispatch sequence number sent
    sequence: AtomicU64,

    /// Last time any frame arrived from the client
    last_activity: Mutex<Instant>,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            id,
            principal: OnceLock::new(),
            sender,
            sequence: AtomicU64::new(0),
            last_activity: Mutex::new(Instant::now()),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the principal (if identified)
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.get()
    }

    /// Bind the principal; fails if the connection is already identified
    pub fn set_principal(&self, principal: Principal) -> Result<(), Principal> {
        self.principal.set(principal)
    }

    /// Check if the connection has identified
    pub fn is_identified(&self) -> bool {
        self.principal.get().is_some()
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get the current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Record inbound activity
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the client last sent anything
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Send a message to this connection, waiting for channel capacity
    pub async fn send(&self, message: GatewayMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Frame(message)).await
    }

    /// Reserve channel capacity, then build and queue a frame
    ///
    /// `build` only runs once a slot is held, so a dropped frame never
    /// consumes a sequence number.
    pub fn try_send_with(
        &self,
        build: impl FnOnce(&Self) -> GatewayMessage,
    ) -> Result<(), mpsc::error::TrySendError<()>> {
        let permit = self.sender.try_reserve()?;
        permit.send(Outbound::Frame(build(self)));
        Ok(())
    }

    /// Ask the writer task to close the socket
    pub fn close(&self, code: CloseCode) {
        // A full or closed channel means the socket is already going away
        let _ = self.sender.try_send(Outbound::Close(code));
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("principal", &self.principal.get())
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish()
    }
}
