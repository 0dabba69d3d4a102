//! Gateway state
//!
//! Application state shared by the WebSocket handler, the op handlers, the
//! delivery dispatcher, and the HTTP endpoints.

use std::sync::Arc;

use relay_broker::SharedRelay;
use relay_common::{AppConfig, JwtService};
use relay_core::{Authenticator, Destination, MessageRecorder, Router, UserDirectory};
use tokio::sync::Mutex;

use crate::broadcast::DeliveryDispatcher;
use crate::collaborators::{JwtAuthenticator, StaticUserDirectory, TracingMessageRecorder};
use crate::connection::{ConnectionManager, InterestChange, SessionRegistry};

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    config: Arc<AppConfig>,
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionManager>,
    relay: SharedRelay,
    router: Router,
    authenticator: Arc<dyn Authenticator>,
    recorder: Arc<dyn MessageRecorder>,
    directory: Arc<dyn UserDirectory>,
    dispatcher: Arc<DeliveryDispatcher>,
    /// Serializes upstream watch/unwatch so they follow registry order
    interest_lock: Arc<Mutex<()>>,
}

impl GatewayState {
    /// Start building state around a relay
    pub fn builder(config: AppConfig, relay: SharedRelay) -> GatewayStateBuilder {
        GatewayStateBuilder::new(config, relay)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the connection manager
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Get the broker relay
    pub fn relay(&self) -> &SharedRelay {
        &self.relay
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn recorder(&self) -> &Arc<dyn MessageRecorder> {
        &self.recorder
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Get the delivery dispatcher (started by the server, not the builder)
    pub fn dispatcher(&self) -> &Arc<DeliveryDispatcher> {
        &self.dispatcher
    }

    /// Bring upstream subscriptions in line with registry interest changes
    pub async fn apply_interest<I>(&self, changes: I)
    where
        I: IntoIterator<Item = InterestChange>,
    {
        for change in changes {
            self.sync_interest(change.destination()).await;
        }
    }

    /// Watch or unwatch a destination upstream based on current local interest
    ///
    /// Re-reads the registry under the interest lock, so concurrent changes for
    /// the same destination settle on the registry's final state.
    pub async fn sync_interest(&self, destination: &Destination) {
        let _guard = self.interest_lock.lock().await;

        let result = if self.registry.has_subscribers(destination) {
            self.relay.watch(destination).await
        } else {
            self.relay.unwatch(destination).await
        };

        if let Err(e) = result {
            tracing::warn!(destination = %destination, error = %e, "Failed to update upstream interest");
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("connections", &self.connections)
            .field("relay_state", &self.relay.state())
            .field("config", &"AppConfig")
            .finish()
    }
}

/// Builder for [`GatewayState`]
///
/// Collaborators default to the JWT authenticator, the tracing recorder, and
/// the static directory, all configured from [`AppConfig`].
pub struct GatewayStateBuilder {
    config: AppConfig,
    relay: SharedRelay,
    authenticator: Option<Arc<dyn Authenticator>>,
    recorder: Option<Arc<dyn MessageRecorder>>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl GatewayStateBuilder {
    fn new(config: AppConfig, relay: SharedRelay) -> Self {
        Self {
            config,
            relay,
            authenticator: None,
            recorder: None,
            directory: None,
        }
    }

    /// Set the authenticator
    #[must_use]
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Set the message recorder
    #[must_use]
    pub fn recorder(mut self, recorder: Arc<dyn MessageRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Set the user directory
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn build(self) -> GatewayState {
        let config = self.config;

        let authenticator = self.authenticator.unwrap_or_else(|| {
            let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);
            Arc::new(JwtAuthenticator::new(jwt))
        });
        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(TracingMessageRecorder));
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(StaticUserDirectory::from(&config.directory)));

        let registry = Arc::new(SessionRegistry::new());
        let connections = ConnectionManager::new_shared();
        let dispatcher = DeliveryDispatcher::new(self.relay.clone(), registry.clone(), connections.clone());

        GatewayState {
            router: Router::new(config.delivery.into()),
            config: Arc::new(config),
            registry,
            connections,
            relay: self.relay,
            authenticator,
            recorder,
            directory,
            dispatcher,
            interest_lock: Arc::new(Mutex::new(())),
        }
    }
}
