//! Principal - an authenticated identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated identity (a username)
///
/// Supplied by the authentication collaborator and trusted as-is by the router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Create a principal from a username
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The username
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Consume into the username
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Principal {
    fn from(name: String) -> Self {
        Self(name)
    }
}
