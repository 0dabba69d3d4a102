//! Collaborator traits (ports) - the boundary to excluded subsystems
//!
//! The routing core depends only on these interfaces. Authentication, message
//! persistence, and the user directory are provided by the infrastructure
//! layer.

use async_trait::async_trait;

use crate::entities::{ChatMessage, UserSummary};
use crate::error::DomainError;
use crate::value_objects::Principal;

/// Result type for collaborator operations
pub type DomainResult<T> = Result<T, DomainError>;

// ============================================================================
// Authentication
// ============================================================================

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the principal for a connection from its presented credentials
    ///
    /// Called once per connection before any message is routed.
    async fn resolve_principal(&self, credentials: &str) -> DomainResult<Principal>;
}

// ============================================================================
// Persistence
// ============================================================================

#[async_trait]
pub trait MessageRecorder: Send + Sync {
    /// Record a routed message
    ///
    /// Invoked after routing, off the routing path. Failures are logged by the
    /// caller and never affect delivery.
    async fn record_message(
        &self,
        message: &ChatMessage,
        sender: &Principal,
        receiver: Option<&str>,
    ) -> DomainResult<()>;
}

// ============================================================================
// User Directory
// ============================================================================

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// List all known users
    async fn list_users(&self) -> DomainResult<Vec<UserSummary>>;
}
