//! Destination - a logical routing target
//!
//! Destinations are stable identifiers, not connections. Their string form
//! follows the broker's user-destination convention:
//!
//! - `/topic/public` for the public broadcast topic
//! - `/user/{username}/queue/private` for a user's private queue
//!
//! Usernames are opaque, so the username segment escapes `%` as `%25` and
//! `/` as `%2F`. Every other character is written as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Principal;
use crate::error::DomainError;

/// Path of the public broadcast topic
pub const PUBLIC_TOPIC: &str = "/topic/public";
/// Path of the private queue, scoped per user
pub const PRIVATE_QUEUE: &str = "/queue/private";
/// Prefix of user-scoped destinations
pub const USER_DESTINATION_PREFIX: &str = "/user";

/// Routing target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Destination {
    /// The public broadcast topic (singleton)
    PublicTopic,
    /// A user's private queue, shared by all of that user's sessions
    UserQueue(String),
}

impl Destination {
    /// The public broadcast topic
    #[must_use]
    pub fn public() -> Self {
        Self::PublicTopic
    }

    /// The private queue of a user
    #[must_use]
    pub fn user_queue(username: impl Into<String>) -> Self {
        Self::UserQueue(username.into())
    }

    /// Fully-qualified destination path
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::PublicTopic => PUBLIC_TOPIC.to_string(),
            Self::UserQueue(name) => {
                format!("{USER_DESTINATION_PREFIX}/{}{PRIVATE_QUEUE}", escape_segment(name))
            }
        }
    }

    /// Parse a fully-qualified destination path
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        if path == PUBLIC_TOPIC {
            return Ok(Self::PublicTopic);
        }

        let name = path
            .strip_prefix(USER_DESTINATION_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_suffix(PRIVATE_QUEUE))
            .filter(|segment| !segment.is_empty())
            .and_then(unescape_segment)
            .ok_or_else(|| DomainError::InvalidDestination(path.to_string()))?;

        Ok(Self::UserQueue(name))
    }

    /// Resolve a path a client asked to subscribe to
    ///
    /// `/user/queue/private` and `/queue/private` resolve to the caller's own
    /// queue. A fully-qualified user queue is only accepted for the caller.
    pub fn resolve_for(path: &str, principal: &Principal) -> Result<Self, DomainError> {
        let own_queue = format!("{USER_DESTINATION_PREFIX}{PRIVATE_QUEUE}");
        if path == own_queue || path == PRIVATE_QUEUE {
            return Ok(Self::UserQueue(principal.name().to_string()));
        }

        match Self::parse(path)? {
            Self::UserQueue(name) if name != principal.name() => {
                Err(DomainError::ForbiddenDestination(path.to_string()))
            }
            destination => Ok(destination),
        }
    }
}

fn escape_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of `escape_segment`; only the two escapes it emits are accepted
fn unescape_segment(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find(['%', '/']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("%25") {
            out.push('%');
        } else if tail.starts_with("%2F") {
            out.push('/');
        } else {
            return None;
        }
        rest = &tail[3..];
    }
    out.push_str(rest);
    Some(out)
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl TryFrom<String> for Destination {
    type Error = DomainError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::parse(&path)
    }
}

impl From<Destination> for String {
    fn from(destination: Destination) -> Self {
        destination.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_paths() {
        assert_eq!(Destination::public().path(), "/topic/public");
        assert_eq!(
            Destination::user_queue("bob").path(),
            "/user/bob/queue/private"
        );
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse("/topic/public").unwrap(), Destination::PublicTopic);
        assert_eq!(
            Destination::parse("/user/bob/queue/private").unwrap(),
            Destination::UserQueue("bob".to_string())
        );
    }

    #[test]
    fn test_destination_parse_rejects_unknown_paths() {
        for path in [
            "/topic/other",
            "/user//queue/private",
            "/user/a/b/queue/private",
            "/user/a%2/queue/private",
            "/user/a%41/queue/private",
            "/queue/private",
            "",
        ] {
            assert!(
                matches!(Destination::parse(path), Err(DomainError::InvalidDestination(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_user_queue_path_round_trips_any_username() {
        for name in [
            "bob",
            "team/ops",
            "/leading",
            "trailing/",
            "a//b",
            "100%",
            "%2F",
            "x/queue/private",
            "queue",
            "späce and ünïcode",
        ] {
            let destination = Destination::user_queue(name);
            let path = destination.path();
            assert!(path.starts_with("/user/") && path.ends_with("/queue/private"));
            assert_eq!(Destination::parse(&path).unwrap(), destination, "{name} via {path}");
        }
    }

    #[test]
    fn test_slash_in_username_is_escaped() {
        let destination = Destination::user_queue("team/ops");
        assert_eq!(destination.path(), "/user/team%2Fops/queue/private");

        let ops = Principal::new("team/ops");
        assert_eq!(
            Destination::resolve_for("/user/team%2Fops/queue/private", &ops).unwrap(),
            destination
        );
        assert!(matches!(
            Destination::resolve_for("/user/team%2Fops/queue/private", &Principal::new("team")),
            Err(DomainError::ForbiddenDestination(_))
        ));
    }

    #[test]
    fn test_resolve_own_queue_shorthand() {
        let alice = Principal::new("alice");
        assert_eq!(
            Destination::resolve_for("/user/queue/private", &alice).unwrap(),
            Destination::user_queue("alice")
        );
        assert_eq!(
            Destination::resolve_for("/queue/private", &alice).unwrap(),
            Destination::user_queue("alice")
        );
        assert_eq!(
            Destination::resolve_for("/user/alice/queue/private", &alice).unwrap(),
            Destination::user_queue("alice")
        );
        assert_eq!(
            Destination::resolve_for("/topic/public", &alice).unwrap(),
            Destination::PublicTopic
        );
    }

    #[test]
    fn test_resolve_rejects_foreign_queue() {
        let alice = Principal::new("alice");
        let result = Destination::resolve_for("/user/bob/queue/private", &alice);
        assert!(matches!(result, Err(DomainError::ForbiddenDestination(_))));
    }

    #[test]
    fn test_destination_serde_uses_path() {
        let json = serde_json::to_string(&Destination::user_queue("bob")).unwrap();
        assert_eq!(json, r#""/user/bob/queue/private""#);

        let parsed: Destination = serde_json::from_str(r#""/topic/public""#).unwrap();
        assert_eq!(parsed, Destination::PublicTopic);

        assert!(serde_json::from_str::<Destination>(r#""/nowhere""#).is_err());
    }
}
