//! Handler error types

use relay_broker::RelayError;
use relay_core::DomainError;
use thiserror::Error;

use crate::protocol::{CloseCode, GatewayMessage, OpCode};

/// Handler error type
///
/// Every variant except `ConnectionClosed` is reported to the client as an
/// Error frame and leaves the connection open.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload missing or not the shape the op expects
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Server-only op sent by the client
    #[error("Unexpected op code: {0}")]
    UnexpectedOp(OpCode),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// The connection's outbound channel is gone
    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    /// Stable code reported in the Error frame
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "MALFORMED_MESSAGE",
            Self::NotAuthenticated => DomainError::Unauthenticated.code(),
            Self::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            Self::UnexpectedOp(_) => "UNKNOWN_OPCODE",
            Self::Domain(e) => e.code(),
            Self::Relay(e) if e.is_unavailable() => "RELAY_UNAVAILABLE",
            Self::Relay(_) => "RELAY_ERROR",
            Self::ConnectionClosed => "CONNECTION_CLOSED",
        }
    }

    /// Convert to a close code (if the connection cannot continue)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::ConnectionClosed => Some(CloseCode::UnknownError),
            _ => None,
        }
    }

    /// Error frame to send back to the client
    pub fn to_error_frame(&self) -> GatewayMessage {
        GatewayMessage::error(self.code(), self.to_string())
    }

    /// Whether the error points at the client rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Relay(_) | Self::ConnectionClosed)
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
