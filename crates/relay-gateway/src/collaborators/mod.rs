//! Default implementations of the collaborator traits
//!
//! Authentication, message recording, and the user directory are external
//! concerns; these implementations keep a single gateway self-contained.

mod directory;
mod jwt_authenticator;
mod recorder;

pub use directory::StaticUserDirectory;
pub use jwt_authenticator::JwtAuthenticator;
pub use recorder::{InMemoryMessageRecorder, RecordedMessage, TracingMessageRecorder};
