//! Broker relay abstraction

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{Destination, OutboundEnvelope};
use tokio::sync::{broadcast, watch};

use crate::error::RelayResult;
use crate::state::RelayState;

/// The single logical upstream connection to the pub/sub broker
///
/// Implementations publish routed envelopes, track which destinations local
/// sessions are interested in, and fan broker deliveries out to every
/// in-process consumer.
#[async_trait]
pub trait BrokerRelay: Send + Sync {
    /// Encode and write an envelope upstream
    ///
    /// Returns `RelayError::Unavailable` without waiting when the relay is not
    /// `Connected`. Publishes are never retried or queued.
    async fn publish(&self, envelope: &OutboundEnvelope) -> RelayResult<()>;

    /// Current connection state
    fn state(&self) -> RelayState;

    /// Watch connection state transitions
    fn state_changes(&self) -> watch::Receiver<RelayState>;

    /// Receive envelopes delivered by the broker
    fn deliveries(&self) -> broadcast::Receiver<OutboundEnvelope>;

    /// Start receiving deliveries for a destination
    async fn watch(&self, destination: &Destination) -> RelayResult<()>;

    /// Stop receiving deliveries for a destination
    async fn unwatch(&self, destination: &Destination) -> RelayResult<()>;

    /// Close the upstream connection
    async fn shutdown(&self) -> RelayResult<()>;
}

/// Relay handle shared across the gateway
pub type SharedRelay = Arc<dyn BrokerRelay>;
