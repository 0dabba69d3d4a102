//! Delivery fan-out
//!
//! Pushes envelopes arriving from the broker relay to the local connections
//! subscribed to their destination.

mod dispatcher;

pub use dispatcher::DeliveryDispatcher;
