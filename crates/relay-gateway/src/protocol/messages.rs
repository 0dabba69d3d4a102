//! Gateway message format
//!
//! Every frame on the socket is a JSON object `{ op, t?, s?, d? }`.

use super::{
    DestinationPayload, ErrorPayload, HelloPayload, IdentifyPayload, MessagePayload, OpCode,
    ReadyPayload,
};
use relay_core::ChatMessage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dispatch event sent once Identify succeeds
pub const EVENT_READY: &str = "READY";
/// Dispatch event carrying a delivered chat message
pub const EVENT_MESSAGE: &str = "MESSAGE";

/// Gateway message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn bare(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: None,
        }
    }

    fn with_data(op: OpCode, data: impl Serialize) -> Self {
        Self {
            d: Some(serde_json::to_value(data).unwrap_or_default()),
            ..Self::bare(op)
        }
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create the `READY` dispatch
    #[must_use]
    pub fn ready(sequence: u64, payload: &ReadyPayload) -> Self {
        Self::dispatch(
            EVENT_READY,
            sequence,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    /// Create a `MESSAGE` dispatch
    #[must_use]
    pub fn message(sequence: u64, payload: &MessagePayload) -> Self {
        Self::dispatch(
            EVENT_MESSAGE,
            sequence,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::with_data(OpCode::Hello, payload)
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::bare(OpCode::HeartbeatAck)
    }

    /// Create an Error message (op=8)
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_data(
            OpCode::Error,
            ErrorPayload {
                code: code.into(),
                message: message.into(),
            },
        )
    }

    // === Parsing Client Messages ===

    fn payload_for<T: DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        self.payload_for(OpCode::Identify)
    }

    /// Try to parse as a chat message (op=3)
    pub fn as_send(&self) -> Option<ChatMessage> {
        self.payload_for(OpCode::Send)
    }

    /// Try to parse a Subscribe or Unsubscribe payload (op=4, op=5)
    pub fn as_destination(&self) -> Option<DestinationPayload> {
        match self.op {
            OpCode::Subscribe | OpCode::Unsubscribe => self.payload_for(self.op),
            _ => None,
        }
    }

    /// Try to parse as an Error payload (op=8)
    pub fn as_error(&self) -> Option<ErrorPayload> {
        self.payload_for(OpCode::Error)
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
