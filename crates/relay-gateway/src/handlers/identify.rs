//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload, ReadyPayload};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Resolve the connection's principal and register its session
    ///
    /// The authenticator is consulted once per connection; a second Identify
    /// is rejected without reaching it.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_identified() {
            tracing::warn!(
                connection_id = %connection.id(),
                "Client sent Identify while already authenticated"
            );
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let principal = state
            .authenticator()
            .resolve_principal(&payload.token)
            .await
            .inspect_err(|e| {
                tracing::debug!(connection_id = %connection.id(), error = %e, "Authentication failed");
            })?;

        connection
            .set_principal(principal.clone())
            .map_err(|_| HandlerError::AlreadyAuthenticated)?;

        let lost = state.registry().on_connect(connection.id(), principal.clone());
        state.apply_interest(lost).await;

        if state.connections().get_connection(connection.id()).is_none() {
            tracing::debug!(connection_id = %connection.id(), "Connection torn down during Identify");
            let lost = state.registry().on_disconnect(connection.id());
            state.apply_interest(lost).await;
            return Err(HandlerError::ConnectionClosed);
        }

        tracing::info!(
            connection_id = %connection.id(),
            principal = %principal,
            "Connection identified"
        );

        let ready = ReadyPayload {
            connection_id: connection.id().to_string(),
            username: principal.into_inner(),
        };
        connection
            .send(GatewayMessage::ready(connection.next_sequence(), &ready))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        Ok(None)
    }
}
