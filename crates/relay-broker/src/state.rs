//! Relay connection state machine

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Upstream connection state
///
/// `Disconnected → Connecting → Connected`, falling back to `Disconnected` on
/// failure. Transitions are driven by the reconnection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
}

impl RelayState {
    /// Check if publishing is possible
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Get the name of this state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, observable relay state
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<RelayState>>,
}

impl StateCell {
    /// Create a cell holding `initial`
    #[must_use]
    pub fn new(initial: RelayState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current state
    pub fn get(&self) -> RelayState {
        *self.tx.borrow()
    }

    /// Move to `state`, returning the previous one
    pub fn set(&self, state: RelayState) -> RelayState {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "Broker relay state changed");
        }
        previous
    }

    /// Watch for state changes
    pub fn subscribe(&self) -> watch::Receiver<RelayState> {
        self.tx.subscribe()
    }
}
