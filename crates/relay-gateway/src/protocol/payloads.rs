//! Payload definitions for gateway messages

use std::collections::BTreeMap;

use relay_core::{ChatMessage, OutboundEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (60 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 60_000;

    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Authentication token, optionally `Bearer `-prefixed
    pub token: String,
}

/// Payload for op 4 (Subscribe) and op 5 (Unsubscribe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationPayload {
    pub destination: String,
}

/// Payload for op 8 (Error)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable machine-readable code
    pub code: String,
    pub message: String,
}

/// Data of the `READY` dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub connection_id: String,
    pub username: String,
}

/// Data of the `MESSAGE` dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Destination path the message was delivered on
    pub destination: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    pub message: ChatMessage,
}

impl From<&OutboundEnvelope> for MessagePayload {
    fn from(envelope: &OutboundEnvelope) -> Self {
        Self {
            destination: envelope.destination.path(),
            headers: envelope.headers.clone(),
            message: envelope.payload.clone(),
        }
    }
}
