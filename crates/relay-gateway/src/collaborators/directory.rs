//! Static user directory

use async_trait::async_trait;
use relay_common::DirectoryConfig;
use relay_core::{DomainResult, UserDirectory, UserSummary};

/// User directory backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: Vec<UserSummary>,
}

impl StaticUserDirectory {
    /// Build from usernames, numbering them from 1
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| UserSummary::new(id, name))
            .collect();
        Self { users }
    }
}

impl From<&DirectoryConfig> for StaticUserDirectory {
    fn from(config: &DirectoryConfig) -> Self {
        Self::from_names(config.users.iter().cloned())
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn list_users(&self) -> DomainResult<Vec<UserSummary>> {
        Ok(self.users.clone())
    }
}
