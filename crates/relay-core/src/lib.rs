//! # relay-core
//!
//! Domain layer for the chat relay: messages, principals, destinations, routed
//! envelopes, the router, and the collaborator traits the gateway depends on.
//! This crate has zero dependencies on infrastructure (broker, web framework, etc.).

pub mod entities;
pub mod error;
pub mod routing;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    ChatMessage, OutboundEnvelope, UserSummary, HEADER_AUTO_DELETE, HEADER_MESSAGE_TTL,
    HEADER_SENDER_ID,
};
pub use error::DomainError;
pub use routing::{DeliveryHints, Router};
pub use traits::{Authenticator, DomainResult, MessageRecorder, UserDirectory};
pub use value_objects::{
    Destination, Principal, PRIVATE_QUEUE, PUBLIC_TOPIC, USER_DESTINATION_PREFIX,
};
