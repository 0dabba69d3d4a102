//! Shared fixtures for unit tests

use std::sync::Arc;

use relay_broker::LocalRelay;
use relay_common::{AppConfig, JwtService};
use tokio::sync::mpsc;

use crate::collaborators::InMemoryMessageRecorder;
use crate::connection::{Connection, ConnectionId, Outbound};
use crate::protocol::GatewayMessage;
use crate::server::GatewayState;

pub const TEST_SECRET: &str = "test-secret-key-that-is-long-enough";

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "GATEWAY_PORT" => Some("0".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "CHAT_USERS" => Some("alice,bob".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn token_for(username: &str) -> String {
    JwtService::new(TEST_SECRET, 900).issue_token(username).unwrap()
}

pub struct Fixture {
    pub state: GatewayState,
    pub relay: Arc<LocalRelay>,
    pub recorder: Arc<InMemoryMessageRecorder>,
}

pub fn fixture() -> Fixture {
    let relay = Arc::new(LocalRelay::default());
    let recorder = Arc::new(InMemoryMessageRecorder::new());
    let state = GatewayState::builder(test_config(), relay.clone())
        .recorder(recorder.clone())
        .build();

    Fixture {
        state,
        relay,
        recorder,
    }
}

/// Register a connection with the manager and return its outbound receiver
pub fn open_connection(state: &GatewayState) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
    let (tx, rx) = mpsc::channel(32);
    let connection = state.connections().add_connection(ConnectionId::generate(), tx);
    (connection, rx)
}

/// Next frame queued for a connection, if any
pub fn next_frame(rx: &mut mpsc::Receiver<Outbound>) -> Option<GatewayMessage> {
    match rx.try_recv() {
        Ok(Outbound::Frame(message)) => Some(message),
        _ => None,
    }
}
