//! # relay-broker
//!
//! Client side of the external pub/sub broker the chat relay forwards through.
//!
//! ## Features
//!
//! - **Frame codec**: envelopes travel as JSON frames on a broker channel named
//!   after the destination path
//! - **State machine**: `Disconnected → Connecting → Connected`, driven by a
//!   bounded exponential backoff
//! - **Fail fast**: `publish` returns `RelayError::Unavailable` immediately
//!   while not connected; nothing is queued
//! - **Upstream interest**: destinations are subscribed upstream only while a
//!   local session wants them, and re-subscribed after every reconnect
//!
//! ## Example
//!
//! ```ignore
//! use relay_broker::{BrokerRelay, RedisRelay, RedisRelayConfig};
//!
//! let relay = RedisRelay::connect(RedisRelayConfig::from(&config.broker));
//! relay.watch(&Destination::public()).await?;
//! relay.publish(&envelope).await?;
//!
//! let mut deliveries = relay.deliveries();
//! while let Ok(envelope) = deliveries.recv().await {
//!     // push to local subscribers
//! }
//! ```

mod backoff;
mod error;
mod frame;
mod local;
mod redis_relay;
mod relay;
mod state;

pub use backoff::ReconnectStrategy;
pub use error::{RelayError, RelayResult};
pub use frame::{on_frame_received, RelayFrame};
pub use local::LocalRelay;
pub use redis_relay::{RedisRelay, RedisRelayConfig};
pub use relay::{BrokerRelay, SharedRelay};
pub use state::{RelayState, StateCell};
