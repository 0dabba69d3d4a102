//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Authentication Errors
    // =========================================================================
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Destination not permitted: {0}")]
    ForbiddenDestination(String),

    // =========================================================================
    // Session Invariant Violations
    // =========================================================================
    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),
}

impl DomainError {
    /// Get an error code string for client-facing responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::MalformedMessage(_) => "MALFORMED_MESSAGE",
            Self::InvalidDestination(_) => "INVALID_DESTINATION",
            Self::ForbiddenDestination(_) => "FORBIDDEN_DESTINATION",
            Self::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
        }
    }

    /// Check if this is an authentication error
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::AuthenticationFailed(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MalformedMessage(_) | Self::InvalidDestination(_))
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::ForbiddenDestination(_))
    }
}
