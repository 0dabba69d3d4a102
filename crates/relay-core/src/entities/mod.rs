//! Domain entities

mod envelope;
mod message;
mod user;

pub use envelope::{OutboundEnvelope, HEADER_AUTO_DELETE, HEADER_MESSAGE_TTL, HEADER_SENDER_ID};
pub use message::ChatMessage;
pub use user::UserSummary;
