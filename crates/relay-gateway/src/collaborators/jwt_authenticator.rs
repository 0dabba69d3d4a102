//! JWT-backed authenticator

use async_trait::async_trait;
use relay_common::JwtService;
use relay_core::{Authenticator, DomainError, DomainResult, Principal};

/// Resolves principals from HS256 access tokens whose subject is the username
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    jwt: JwtService,
}

impl JwtAuthenticator {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn resolve_principal(&self, credentials: &str) -> DomainResult<Principal> {
        self.jwt
            .resolve_principal(credentials)
            .map_err(|e| DomainError::AuthenticationFailed(e.to_string()))
    }
}
