//! Router - decides where a chat message goes
//!
//! Routing is pure: it needs only the message and the sender's identity, holds
//! no locks, and does no I/O. Whether the recipient of a direct message is
//! reachable is a delivery-time concern of the broker relay.

use crate::entities::{
    ChatMessage, OutboundEnvelope, HEADER_AUTO_DELETE, HEADER_MESSAGE_TTL, HEADER_SENDER_ID,
};
use crate::value_objects::{Destination, Principal};

/// Advisory delivery hints attached to private envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryHints {
    /// Attach `auto-delete: true`
    pub auto_delete: bool,
    /// Attach `x-message-ttl` with this many milliseconds
    pub message_ttl_ms: Option<u64>,
}

impl Default for DeliveryHints {
    fn default() -> Self {
        Self {
            auto_delete: true,
            message_ttl_ms: Some(6000),
        }
    }
}

impl DeliveryHints {
    /// No advisory hints, only the sender tag
    #[must_use]
    pub fn none() -> Self {
        Self {
            auto_delete: false,
            message_ttl_ms: None,
        }
    }
}

/// Message router
#[derive(Debug, Clone, Copy, Default)]
pub struct Router {
    hints: DeliveryHints,
}

impl Router {
    /// Create a router with the given delivery hints
    #[must_use]
    pub fn new(hints: DeliveryHints) -> Self {
        Self { hints }
    }

    /// The delivery hints in use
    pub fn hints(&self) -> DeliveryHints {
        self.hints
    }

    /// Route a message from an authenticated sender
    ///
    /// Every message yields exactly one envelope. Broadcasts carry no headers;
    /// direct messages carry the sender's name under `id` plus the configured
    /// advisory hints.
    pub fn route(&self, message: ChatMessage, sender: &Principal) -> OutboundEnvelope {
        let Some(recipient) = message.to.clone() else {
            return OutboundEnvelope::new(Destination::PublicTopic, message);
        };

        let mut envelope = OutboundEnvelope::new(Destination::UserQueue(recipient), message)
            .with_header(HEADER_SENDER_ID, sender.name());

        if self.hints.auto_delete {
            envelope = envelope.with_header(HEADER_AUTO_DELETE, true);
        }
        if let Some(ttl) = self.hints.message_ttl_ms {
            envelope = envelope.with_header(HEADER_MESSAGE_TTL, ttl);
        }

        envelope
    }
}
