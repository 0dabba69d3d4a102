//! Collaborator traits (ports)

mod collaborators;

pub use collaborators::{Authenticator, DomainResult, MessageRecorder, UserDirectory};
