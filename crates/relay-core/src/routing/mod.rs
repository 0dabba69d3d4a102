//! Message routing

mod router;

pub use router::{DeliveryHints, Router};
