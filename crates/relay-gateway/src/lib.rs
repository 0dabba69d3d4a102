//! # relay-gateway
//!
//! WebSocket gateway for the chat relay. Terminates client connections,
//! tracks sessions and subscriptions, routes inbound messages through the
//! broker relay, and pushes deliveries back to local subscribers.

pub mod broadcast;
pub mod collaborators;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, serve, GatewayState};

#[cfg(test)]
pub(crate) mod test_support;
