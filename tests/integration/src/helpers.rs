//! Test helpers for integration tests
//!
//! Spawns the gateway on an ephemeral port with an in-process relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use relay_broker::LocalRelay;
use relay_common::{AppConfig, JwtService};
use relay_gateway::{create_app, GatewayState};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_SECRET: &str = "integration-test-secret-key";

/// Create a test configuration
pub fn test_config() -> Result<AppConfig> {
    test_config_with(&[])
}

/// Create a test configuration with extra or overriding variables
pub fn test_config_with(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let base = [
        ("GATEWAY_HOST", "127.0.0.1"),
        ("GATEWAY_PORT", "0"),
        ("JWT_SECRET", TEST_SECRET),
        ("CHAT_USERS", "alice,bob,carol"),
    ];

    let config = AppConfig::from_lookup(|key| {
        overrides
            .iter()
            .chain(base.iter())
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    })
    .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

    Ok(config)
}

/// Issue a bearer token for a user
pub fn token_for(username: &str) -> Result<String> {
    Ok(JwtService::new(TEST_SECRET, 900).issue_token(username)?)
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub relay: Arc<LocalRelay>,
    pub state: GatewayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()?).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let relay = Arc::new(LocalRelay::default());
        let state = GatewayState::builder(config, relay.clone()).build();
        state.dispatcher().start();

        let app = create_app(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            relay,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket endpoint URL
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}
