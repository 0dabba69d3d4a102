//! Chat message entity - the unit clients send and receive

use serde::{Deserialize, Serialize};

use crate::value_objects::Principal;

/// A chat message as sent by a client
///
/// `to` absent means a public broadcast; present means a direct message to a
/// single named user. The core imposes no size or content limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub from: String,
    pub text: String,
    #[serde(default)]
    pub to: Option<String>,
}

impl ChatMessage {
    /// Create a public broadcast message
    pub fn public(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            text: text.into(),
            to: None,
        }
    }

    /// Create a direct message to a single user
    pub fn direct(
        from: impl Into<String>,
        text: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            text: text.into(),
            to: Some(to.into()),
        }
    }

    /// Check if this message is addressed to a single user
    #[inline]
    pub fn is_private(&self) -> bool {
        self.to.is_some()
    }

    /// Get the recipient username, if any
    #[inline]
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Return a copy attributed to the given principal
    ///
    /// Clients may put anything in `from`; the gateway stamps the
    /// authenticated name before routing.
    #[must_use]
    pub fn attributed_to(self, principal: &Principal) -> Self {
        Self {
            from: principal.name().to_string(),
            ..self
        }
    }
}
