//! Heartbeat handler (op 1)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat
    ///
    /// Liveness is recorded for every inbound frame by the socket loop; this
    /// only answers.
    pub async fn handle(connection: &Arc<Connection>) -> HandlerResult<Option<CloseCode>> {
        tracing::trace!(
            connection_id = %connection.id(),
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        connection
            .send(GatewayMessage::heartbeat_ack())
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        Ok(None)
    }
}
