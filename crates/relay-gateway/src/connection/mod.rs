//! Connection management
//!
//! Live sockets, the sessions bound to them, and the subscription registry.

mod connection;
mod manager;
mod registry;
mod session;

pub use connection::{Connection, Outbound};
pub use manager::{ConnectionManager, PushOutcome};
pub use registry::{InterestChange, SessionRegistry};
pub use session::{ConnectionId, Session};
