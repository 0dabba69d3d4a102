//! Send handler (op 3)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use relay_core::{ChatMessage, DomainError};
use std::sync::Arc;

/// Handles chat messages sent by identified connections
pub struct SendHandler;

impl SendHandler {
    /// Route a chat message and hand it to the relay
    ///
    /// The message is stamped with the sender's principal before routing.
    /// Recording runs in the background once the relay has accepted the
    /// envelope.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: ChatMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        let principal = connection
            .principal()
            .cloned()
            .ok_or(HandlerError::NotAuthenticated)?;

        if message.recipient().is_some_and(|to| to.trim().is_empty()) {
            return Err(DomainError::MalformedMessage("recipient must not be empty".to_string()).into());
        }

        let message = message.attributed_to(&principal);
        let envelope = state.router().route(message.clone(), &principal);

        state.relay().publish(&envelope).await.inspect_err(|e| {
            tracing::warn!(
                connection_id = %connection.id(),
                destination = %envelope.destination,
                error = %e,
                "Relay rejected message"
            );
        })?;

        tracing::debug!(
            connection_id = %connection.id(),
            destination = %envelope.destination,
            "Message relayed"
        );

        let recorder = Arc::clone(state.recorder());
        tokio::spawn(async move {
            let receiver = message.to.clone();
            if let Err(e) = recorder
                .record_message(&message, &principal, receiver.as_deref())
                .await
            {
                tracing::error!(sender = %principal, error = %e, "Failed to record message");
            }
        });

        Ok(None)
    }
}
