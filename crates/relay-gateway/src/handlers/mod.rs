//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod error;
mod heartbeat;
mod identify;
mod send;
mod subscription;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use send::SendHandler;
pub use subscription::SubscriptionHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    ///
    /// `Ok(Some(code))` asks the socket loop to close the connection.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                connection_id = %connection.id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Err(HandlerError::UnexpectedOp(message.op));
        }

        if message.op.requires_identify() && !connection.is_identified() {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.op {
            OpCode::Identify => {
                let payload = message.as_identify().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Identify payload".to_string())
                })?;

                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::Heartbeat => HeartbeatHandler::handle(connection).await,
            OpCode::Send => {
                let chat = message.as_send().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Send payload".to_string())
                })?;

                SendHandler::handle(state, connection, chat).await
            }
            OpCode::Subscribe => {
                let payload = message.as_destination().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Subscribe payload".to_string())
                })?;

                SubscriptionHandler::subscribe(state, connection, &payload.destination).await
            }
            OpCode::Unsubscribe => {
                let payload = message.as_destination().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Unsubscribe payload".to_string())
                })?;

                SubscriptionHandler::unsubscribe(state, connection, &payload.destination).await
            }
            OpCode::Disconnect => {
                tracing::debug!(connection_id = %connection.id(), "Client requested disconnect");
                Ok(Some(CloseCode::Normal))
            }
            // Filtered out by the is_client_op check above
            _ => Err(HandlerError::UnexpectedOp(message.op)),
        }
    }
}
