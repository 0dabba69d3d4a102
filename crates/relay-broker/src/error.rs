//! Broker relay errors

/// Error type for relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The upstream connection is down (or still connecting)
    #[error("Broker relay unavailable")]
    Unavailable,

    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("Frame codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The frame outlived its `x-message-ttl`
    #[error("Frame expired {age_ms} ms after publish (ttl {ttl_ms} ms)")]
    Expired { age_ms: u64, ttl_ms: u64 },

    #[error("Relay control channel closed")]
    ChannelClosed,
}

impl RelayError {
    /// Whether the error means the upstream connection is gone
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable | Self::ChannelClosed => true,
            Self::Broker(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            _ => false,
        }
    }
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
