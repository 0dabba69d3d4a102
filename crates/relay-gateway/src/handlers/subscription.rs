//! Subscribe / Unsubscribe handlers (ops 4 and 5)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use relay_core::Destination;
use std::sync::Arc;

/// Handles destination subscriptions
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    /// Subscribe the connection to a destination it is allowed to read
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        path: &str,
    ) -> HandlerResult<Option<CloseCode>> {
        let destination = Self::resolve(connection, path)?;

        tracing::debug!(connection_id = %connection.id(), destination = %destination, "Subscribe");

        let change = state.registry().on_subscribe(connection.id(), destination);
        state.apply_interest(change).await;

        Ok(None)
    }

    /// Drop a subscription; unknown subscriptions are ignored
    pub async fn unsubscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        path: &str,
    ) -> HandlerResult<Option<CloseCode>> {
        let destination = Self::resolve(connection, path)?;

        tracing::debug!(connection_id = %connection.id(), destination = %destination, "Unsubscribe");

        let change = state.registry().on_unsubscribe(connection.id(), &destination);
        state.apply_interest(change).await;

        Ok(None)
    }

    fn resolve(connection: &Connection, path: &str) -> HandlerResult<Destination> {
        let principal = connection.principal().ok_or(HandlerError::NotAuthenticated)?;
        Ok(Destination::resolve_for(path, principal)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::IdentifyHandler;
    use crate::protocol::IdentifyPayload;
    use crate::test_support::{fixture, open_connection, token_for};
    use relay_core::DomainError;

    #[tokio::test]
    async fn test_subscribe_watches_upstream_once() {
        let fx = fixture();
        let (a, _ra) = open_connection(&fx.state);
        let (b, _rb) = open_connection(&fx.state);
        for conn in [&a, &b] {
            IdentifyHandler::handle(&fx.state, conn, IdentifyPayload { token: token_for("alice") })
                .await
                .unwrap();
            SubscriptionHandler::subscribe(&fx.state, conn, "/topic/public").await.unwrap();
        }

        assert_eq!(fx.relay.watched(), vec![Destination::public()]);
        assert_eq!(fx.state.registry().subscribers_of(&Destination::public()).len(), 2);

        SubscriptionHandler::unsubscribe(&fx.state, &a, "/topic/public").await.unwrap();
        assert_eq!(fx.relay.watched(), vec![Destination::public()]);

        SubscriptionHandler::unsubscribe(&fx.state, &b, "/topic/public").await.unwrap();
        assert!(fx.relay.watched().is_empty());
    }

    #[tokio::test]
    async fn test_own_queue_shorthand() {
        let fx = fixture();
        let (conn, _rx) = open_connection(&fx.state);
        IdentifyHandler::handle(&fx.state, &conn, IdentifyPayload { token: token_for("bob") })
            .await
            .unwrap();

        SubscriptionHandler::subscribe(&fx.state, &conn, "/user/queue/private")
            .await
            .unwrap();

        let session = fx.state.registry().session(conn.id()).unwrap();
        assert!(session.is_subscribed_to(&Destination::user_queue("bob")));
    }

    #[tokio::test]
    async fn test_foreign_queue_is_forbidden() {
        let fx = fixture();
        let (conn, _rx) = open_connection(&fx.state);
        IdentifyHandler::handle(&fx.state, &conn, IdentifyPayload { token: token_for("alice") })
            .await
            .unwrap();

        let result = SubscriptionHandler::subscribe(&fx.state, &conn, "/user/bob/queue/private").await;

        assert!(matches!(
            result,
            Err(HandlerError::Domain(DomainError::ForbiddenDestination(_)))
        ));
        assert!(fx.relay.watched().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_destination_is_invalid() {
        let fx = fixture();
        let (conn, _rx) = open_connection(&fx.state);
        IdentifyHandler::handle(&fx.state, &conn, IdentifyPayload { token: token_for("alice") })
            .await
            .unwrap();

        let result = SubscriptionHandler::subscribe(&fx.state, &conn, "/topic/other").await;

        assert!(matches!(
            result,
            Err(HandlerError::Domain(DomainError::InvalidDestination(_)))
        ));
    }
}
