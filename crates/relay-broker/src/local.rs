//! In-process loopback broker
//!
//! Frames published here go through the same codec as the Redis relay and
//! come straight back as deliveries for watched destinations. Suitable for a
//! single gateway instance and for tests.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use relay_core::{Destination, OutboundEnvelope};
use tokio::sync::{broadcast, watch};

use crate::error::{RelayError, RelayResult};
use crate::frame::{decode_at, RelayFrame};
use crate::relay::BrokerRelay;
use crate::state::{RelayState, StateCell};

/// Loopback relay
pub struct LocalRelay {
    state: StateCell,
    watched: Mutex<HashSet<Destination>>,
    deliveries_tx: broadcast::Sender<OutboundEnvelope>,
}

impl LocalRelay {
    /// Create a connected loopback relay
    #[must_use]
    pub fn new(delivery_buffer: usize) -> Self {
        let (deliveries_tx, _) = broadcast::channel(delivery_buffer.max(1));

        Self {
            state: StateCell::new(RelayState::Connected),
            watched: Mutex::new(HashSet::new()),
            deliveries_tx,
        }
    }

    /// Simulate losing the upstream connection
    pub fn disconnect(&self) {
        self.state.set(RelayState::Disconnected);
    }

    /// Simulate the upstream connection coming back
    pub fn connect(&self) {
        self.state.set(RelayState::Connecting);
        self.state.set(RelayState::Connected);
    }

    /// Destinations currently watched
    pub fn watched(&self) -> Vec<Destination> {
        self.watched.lock().iter().cloned().collect()
    }

    fn is_watched(&self, destination: &Destination) -> bool {
        self.watched.lock().contains(destination)
    }
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for LocalRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRelay")
            .field("state", &self.state.get())
            .field("watched", &self.watched.lock().len())
            .finish()
    }
}

#[async_trait]
impl BrokerRelay for LocalRelay {
    async fn publish(&self, envelope: &OutboundEnvelope) -> RelayResult<()> {
        if !self.state.get().is_connected() {
            return Err(RelayError::Unavailable);
        }

        let now = Utc::now().timestamp_millis();
        let frame = RelayFrame::from_envelope_at(envelope, now);
        let channel = frame.channel().to_string();
        let payload = frame.to_json()?;

        if !self.is_watched(&envelope.destination) {
            tracing::trace!(destination = %channel, "No upstream interest, frame dropped");
            return Ok(());
        }

        let delivered = decode_at(&channel, &payload, now)?;

        // No receivers is not an error
        let _ = self.deliveries_tx.send(delivered);

        tracing::trace!(destination = %channel, "Frame looped back");
        Ok(())
    }

    fn state(&self) -> RelayState {
        self.state.get()
    }

    fn state_changes(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    fn deliveries(&self) -> broadcast::Receiver<OutboundEnvelope> {
        self.deliveries_tx.subscribe()
    }

    async fn watch(&self, destination: &Destination) -> RelayResult<()> {
        if self.watched.lock().insert(destination.clone()) {
            tracing::debug!(destination = %destination, "Watching destination");
        }
        Ok(())
    }

    async fn unwatch(&self, destination: &Destination) -> RelayResult<()> {
        if self.watched.lock().remove(destination) {
            tracing::debug!(destination = %destination, "Stopped watching destination");
        }
        Ok(())
    }

    async fn shutdown(&self) -> RelayResult<()> {
        self.state.set(RelayState::Disconnected);
        Ok(())
    }
}
