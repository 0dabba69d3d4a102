//! Delivery dispatcher
//!
//! Receives envelopes from the broker relay and dispatches them to WebSocket
//! connections.

use crate::connection::{ConnectionManager, PushOutcome, SessionRegistry};
use crate::protocol::{GatewayMessage, MessagePayload};
use parking_lot::Mutex;
use relay_broker::SharedRelay;
use relay_core::OutboundEnvelope;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Dispatcher that routes relay deliveries to local subscribers
pub struct DeliveryDispatcher {
    relay: SharedRelay,
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionManager>,
    /// Whether the dispatcher is running
    running: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryDispatcher {
    pub fn new(
        relay: SharedRelay,
        registry: Arc<SessionRegistry>,
        connections: Arc<ConnectionManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            relay,
            registry,
            connections,
            running: AtomicBool::new(false),
            task: Mutex::new(None),
        })
    }

    /// Start the dispatcher
    ///
    /// The delivery receiver is taken before this returns, so nothing the
    /// relay delivers afterwards is missed.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Delivery dispatcher is already running");
            return;
        }

        let receiver = self.relay.deliveries();
        let dispatcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            dispatcher.run(receiver).await;
        });
        *self.task.lock() = Some(handle);

        tracing::info!("Delivery dispatcher started");
    }

    /// Stop the dispatcher
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        tracing::info!("Delivery dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, mut receiver: broadcast::Receiver<OutboundEnvelope>) {
        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(envelope) => {
                    self.dispatch(&envelope);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Delivery dispatcher lagged behind, deliveries dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Relay delivery channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Delivery dispatcher loop ended");
    }

    /// Push one envelope to every local subscriber of its destination
    ///
    /// A slow connection whose outbound buffer is full loses this delivery;
    /// other subscribers are unaffected. Returns the number of connections the
    /// frame was queued for.
    pub fn dispatch(&self, envelope: &OutboundEnvelope) -> usize {
        let subscribers = self.registry.subscribers_of(&envelope.destination);
        if subscribers.is_empty() {
            tracing::trace!(destination = %envelope.destination, "No local subscribers");
            return 0;
        }

        let payload = MessagePayload::from(envelope);
        let mut delivered = 0;

        for id in subscribers {
            match self
                .connections
                .push(id, |conn| GatewayMessage::message(conn.next_sequence(), &payload))
            {
                PushOutcome::Sent => delivered += 1,
                PushOutcome::Full => {
                    tracing::warn!(
                        connection_id = %id,
                        destination = %envelope.destination,
                        "Outbound buffer full, delivery dropped"
                    );
                }
                PushOutcome::Closed => {
                    tracing::debug!(connection_id = %id, "Subscriber already gone");
                }
            }
        }

        tracing::trace!(
            destination = %envelope.destination,
            delivered,
            "Delivery dispatched"
        );

        delivered
    }
}

impl Drop for DeliveryDispatcher {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
