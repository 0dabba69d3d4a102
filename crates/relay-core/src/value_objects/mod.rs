//! Value objects - immutable identity and addressing types

mod destination;
mod principal;

pub use destination::{Destination, PRIVATE_QUEUE, PUBLIC_TOPIC, USER_DESTINATION_PREFIX};
pub use principal::Principal;
