//! Outbound envelope - the routed unit handed to the broker relay

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ChatMessage;
use crate::value_objects::Destination;

/// Header carrying the originating user's name
pub const HEADER_SENDER_ID: &str = "id";
/// Advisory header asking the broker to drop the queue when unused
pub const HEADER_AUTO_DELETE: &str = "auto-delete";
/// Advisory header with the delivery time-to-live in milliseconds
pub const HEADER_MESSAGE_TTL: &str = "x-message-ttl";

/// A destination paired with a payload and delivery headers
///
/// Headers are additive metadata for the relay and never change what the
/// payload means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub destination: Destination,
    pub payload: ChatMessage,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
}

impl OutboundEnvelope {
    /// Create an envelope with no headers
    pub fn new(destination: Destination, payload: ChatMessage) -> Self {
        Self {
            destination,
            payload,
            headers: BTreeMap::new(),
        }
    }

    /// Attach a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Look up a header value
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// Name of the user who originated a private envelope
    pub fn sender_id(&self) -> Option<&str> {
        self.header(HEADER_SENDER_ID).and_then(Value::as_str)
    }

    /// Delivery time-to-live, when the envelope carries one
    pub fn message_ttl(&self) -> Option<Duration> {
        self.header(HEADER_MESSAGE_TTL)
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
    }

    /// Whether the auto-delete hint is set
    pub fn is_auto_delete(&self) -> bool {
        self.header(HEADER_AUTO_DELETE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
