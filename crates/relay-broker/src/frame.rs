//! Broker frame codec
//!
//! An envelope crosses the broker as a JSON frame published on the channel
//! named by its destination path. The frame repeats the destination so a
//! receiver can reject frames that arrived on the wrong channel.

use std::collections::BTreeMap;

use chrono::Utc;
use relay_core::{ChatMessage, Destination, OutboundEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RelayError, RelayResult};

/// Wire form of an envelope on the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayFrame {
    pub destination: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    pub body: ChatMessage,
    /// Publish time, Unix milliseconds
    pub sent_at: i64,
}

impl RelayFrame {
    /// Build a frame stamped with the current time
    pub fn from_envelope(envelope: &OutboundEnvelope) -> Self {
        Self::from_envelope_at(envelope, Utc::now().timestamp_millis())
    }

    /// Build a frame with an explicit publish time
    pub fn from_envelope_at(envelope: &OutboundEnvelope, sent_at: i64) -> Self {
        Self {
            destination: envelope.destination.path(),
            headers: envelope.headers.clone(),
            body: envelope.payload.clone(),
            sent_at,
        }
    }

    /// Broker channel this frame is published on
    pub fn channel(&self) -> &str {
        &self.destination
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> RelayResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON
    pub fn from_json(payload: &str) -> RelayResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Milliseconds elapsed since publish, floored at zero
    pub fn age_ms(&self, now_ms: i64) -> u64 {
        u64::try_from(now_ms.saturating_sub(self.sent_at)).unwrap_or(0)
    }

    /// Check the `x-message-ttl` header against `now_ms`
    pub fn check_ttl(&self, now_ms: i64) -> RelayResult<()> {
        let ttl_ms = self
            .headers
            .get(relay_core::HEADER_MESSAGE_TTL)
            .and_then(Value::as_u64);

        match ttl_ms {
            Some(ttl_ms) if self.age_ms(now_ms) > ttl_ms => Err(RelayError::Expired {
                age_ms: self.age_ms(now_ms),
                ttl_ms,
            }),
            _ => Ok(()),
        }
    }

    /// Convert back into an envelope
    pub fn into_envelope(self) -> RelayResult<OutboundEnvelope> {
        let destination = Destination::parse(&self.destination)
            .map_err(|e| RelayError::MalformedFrame(e.to_string()))?;

        Ok(OutboundEnvelope {
            destination,
            payload: self.body,
            headers: self.headers,
        })
    }
}

/// Decode a frame received on `channel`
///
/// Fails on undecodable payloads, on a destination that does not match the
/// channel, and on frames older than their TTL.
pub fn on_frame_received(channel: &str, payload: &str) -> RelayResult<OutboundEnvelope> {
    decode_at(channel, payload, Utc::now().timestamp_millis())
}

pub(crate) fn decode_at(channel: &str, payload: &str, now_ms: i64) -> RelayResult<OutboundEnvelope> {
    let frame = RelayFrame::from_json(payload)?;

    if frame.channel() != channel {
        return Err(RelayError::MalformedFrame(format!(
            "frame for {} arrived on {channel}",
            frame.destination
        )));
    }

    frame.check_ttl(now_ms)?;
    frame.into_envelope()
}
