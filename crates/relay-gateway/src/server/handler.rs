//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionId, Outbound};
use crate::handlers::{HandlerError, MessageDispatcher};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// How long cleanup waits for queued frames to flush
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let connection_id = ConnectionId::generate();
    let gateway = &state.config().gateway;
    let heartbeat_ms = gateway.heartbeat_interval_ms.max(1);

    let (tx, mut rx) = mpsc::channel::<Outbound>(gateway.outbound_buffer.max(1));
    let connection = state.connections().add_connection(connection_id, tx);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Hello goes out before anything else can be queued
    let hello = GatewayMessage::hello(HelloPayload::with_interval(heartbeat_ms));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(connection_id = %connection_id, "Failed to send Hello message");
            state.connections().remove_connection(connection_id);
            return;
        }
    }

    let state_recv = state.clone();
    let connection_recv = connection.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            connection_recv.touch();

            match msg {
                Ok(Message::Text(text)) => {
                    if let Some(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Binary messages not supported");
                    let error = HandlerError::InvalidPayload("Binary frames are not supported".to_string());
                    if connection_recv.send(error.to_error_frame()).await.is_err() {
                        return Some(CloseCode::UnknownError);
                    }
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                    tracing::trace!(connection_id = %connection_id, "Ping/Pong received");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %connection_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                    return Some(CloseCode::UnknownError);
                }
            }
        }
        None
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(msg) => {
                    let json = match msg.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(connection_id = %connection_id, error = %e, "Failed to encode frame");
                            continue;
                        }
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(connection_id = %connection_id, "Failed to send message to WebSocket");
                        return;
                    }
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: Cow::Borrowed(code.description()),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    return;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    let connection_hb = connection.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let timeout = Duration::from_millis(heartbeat_ms.saturating_mul(2));
        let mut check_interval = interval(Duration::from_millis(heartbeat_ms / 2).max(Duration::from_millis(1)));

        loop {
            check_interval.tick().await;

            let idle = connection_hb.idle_for();
            if idle > timeout {
                tracing::warn!(
                    connection_id = %connection_id,
                    idle_ms = idle.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                connection_hb.close(CloseCode::SessionTimeout);
                break;
            }
        }
    });

    tokio::select! {
        result = &mut recv_task => {
            match result {
                Ok(Some(close_code)) => {
                    tracing::debug!(connection_id = %connection_id, close_code = %close_code, "Closing connection");
                    connection.close(close_code);
                }
                Ok(None) => connection.close(CloseCode::Normal),
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Receive task failed");
                    connection.close(CloseCode::UnknownError);
                }
            }
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
        _ = &mut heartbeat_task => {
            tracing::debug!(connection_id = %connection_id, "Heartbeat task ended");
        }
    }

    // No inbound frame may be handled once teardown starts
    recv_task.abort();
    heartbeat_task.abort();
    if !recv_task.is_finished() {
        let _ = (&mut recv_task).await;
    }
    if !heartbeat_task.is_finished() {
        let _ = (&mut heartbeat_task).await;
    }

    cleanup_connection(&state, &connection).await;

    if !send_task.is_finished() && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        tracing::debug!(connection_id = %connection_id, "Send task did not flush in time");
        send_task.abort();
    }
}

/// Handle a text message from the client
///
/// Returns a close code when the connection must end. Every other failure is
/// reported with an Error frame and the connection stays open.
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Option<CloseCode> {
    let result = match GatewayMessage::from_json(text) {
        Ok(message) => {
            tracing::trace!(connection_id = %connection.id(), op = %message.op, "Received message");
            MessageDispatcher::dispatch(state, connection, message).await
        }
        Err(e) => {
            tracing::debug!(connection_id = %connection.id(), error = %e, "Failed to parse message");
            Err(HandlerError::InvalidPayload(e.to_string()))
        }
    };

    match result {
        Ok(close_code) => close_code,
        Err(e) => {
            if let Some(close_code) = e.to_close_code() {
                return Some(close_code);
            }

            if e.is_client_error() {
                tracing::debug!(connection_id = %connection.id(), code = e.code(), error = %e, "Rejected client frame");
            } else {
                tracing::warn!(connection_id = %connection.id(), code = e.code(), error = %e, "Handler error");
            }

            connection
                .send(e.to_error_frame())
                .await
                .err()
                .map(|_| CloseCode::UnknownError)
        }
    }
}

/// Clean up a connection on disconnect
///
/// The connection leaves the manager before its session is torn down, so an
/// Identify that slips past teardown sees it gone and undoes itself.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let connection_id = connection.id();
    tracing::info!(connection_id = %connection_id, "Cleaning up connection");

    state.connections().remove_connection(connection_id);

    let lost = state.registry().on_disconnect(connection_id);
    state.apply_interest(lost).await;
}
