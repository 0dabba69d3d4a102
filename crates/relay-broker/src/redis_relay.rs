//! Redis pub/sub broker relay
//!
//! Redis needs a dedicated connection for subscriptions, so one logical
//! upstream is two sockets: a multiplexed connection for `PUBLISH` and `PING`
//! and a pub/sub connection for deliveries. Both are opened together, share
//! one [`StateCell`], and are torn down together when either fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionInfo, IntoConnectionInfo};
use relay_common::BrokerConfig;
use relay_core::{Destination, OutboundEnvelope};
use tokio::sync::{broadcast, mpsc, watch};

use crate::backoff::ReconnectStrategy;
use crate::error::{RelayError, RelayResult};
use crate::frame::{on_frame_received, RelayFrame};
use crate::relay::BrokerRelay;
use crate::state::{RelayState, StateCell};

/// Redis relay configuration
#[derive(Debug, Clone)]
pub struct RedisRelayConfig {
    /// Redis connection URL
    pub url: String,
    /// Sent as the `AUTH` username
    pub login: Option<String>,
    /// Sent as the `AUTH` password
    pub passcode: Option<String>,
    /// `PING` interval on the publish connection; `None` disables it
    pub heartbeat: Option<Duration>,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    /// Upper bound on a single `PUBLISH`
    pub publish_timeout: Duration,
    /// Capacity of the delivery fan-out channel
    pub delivery_buffer: usize,
}

impl RedisRelayConfig {
    /// Connection info with the configured credentials applied
    pub fn connection_info(&self) -> RelayResult<ConnectionInfo> {
        let mut info = self.url.as_str().into_connection_info()?;
        if let Some(login) = &self.login {
            info.redis.username = Some(login.clone());
        }
        if let Some(passcode) = &self.passcode {
            info.redis.password = Some(passcode.clone());
        }
        Ok(info)
    }

    fn reconnect_strategy(&self) -> ReconnectStrategy {
        ReconnectStrategy::new(self.reconnect_initial, self.reconnect_max)
    }
}

impl Default for RedisRelayConfig {
    fn default() -> Self {
        Self::from(&BrokerConfig::default())
    }
}

impl From<&BrokerConfig> for RedisRelayConfig {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            login: config.login.clone(),
            passcode: config.passcode.clone(),
            heartbeat: (config.heartbeat_ms > 0).then(|| Duration::from_millis(config.heartbeat_ms)),
            reconnect_initial: Duration::from_millis(config.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(config.reconnect_max_ms),
            publish_timeout: Duration::from_secs(5),
            delivery_buffer: config.delivery_buffer.max(1),
        }
    }
}

/// Commands for the connection supervisor
#[derive(Debug)]
enum RelayCommand {
    Subscribe(String),
    Unsubscribe(String),
    /// The publish path saw the connection fail
    Reconnect,
    Shutdown,
}

/// Why a connected session ended
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// State shared between the relay handle and its supervisor task
struct Shared {
    state: StateCell,
    /// Channels to keep subscribed across reconnects
    watched: Mutex<HashSet<String>>,
    /// Present only while `Connected`
    publisher: RwLock<Option<MultiplexedConnection>>,
    deliveries_tx: broadcast::Sender<OutboundEnvelope>,
}

impl Shared {
    fn mark_lost(&self) {
        *self.publisher.write() = None;
        self.state.set(RelayState::Disconnected);
    }

    fn deliver(&self, channel: &str, payload: &str) {
        match on_frame_received(channel, payload) {
            Ok(envelope) => {
                // No receivers is not an error
                let _ = self.deliveries_tx.send(envelope);
                tracing::trace!(channel = %channel, "Received broker frame");
            }
            Err(RelayError::Expired { age_ms, ttl_ms }) => {
                tracing::debug!(channel = %channel, age_ms, ttl_ms, "Discarded expired frame");
            }
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Discarded undecodable frame");
            }
        }
    }
}

/// Broker relay over Redis pub/sub
pub struct RedisRelay {
    config: RedisRelayConfig,
    shared: Arc<Shared>,
    control_tx: mpsc::Sender<RelayCommand>,
}

impl RedisRelay {
    /// Create the relay and start connecting in the background
    ///
    /// Returns immediately in `Connecting`; watch [`BrokerRelay::state_changes`]
    /// to learn when the upstream is ready. Must be called inside a Tokio
    /// runtime.
    pub fn connect(config: RedisRelayConfig) -> Self {
        let (deliveries_tx, _) = broadcast::channel(config.delivery_buffer.max(1));
        let (control_tx, control_rx) = mpsc::channel(256);

        let shared = Arc::new(Shared {
            state: StateCell::new(RelayState::Disconnected),
            watched: Mutex::new(HashSet::new()),
            publisher: RwLock::new(None),
            deliveries_tx,
        });

        tokio::spawn(Self::supervise(config.clone(), shared.clone(), control_rx));

        Self {
            config,
            shared,
            control_tx,
        }
    }

    /// Relay configuration
    pub fn config(&self) -> &RedisRelayConfig {
        &self.config
    }

    /// Reconnection loop
    async fn supervise(
        config: RedisRelayConfig,
        shared: Arc<Shared>,
        mut control_rx: mpsc::Receiver<RelayCommand>,
    ) {
        let mut backoff = config.reconnect_strategy();

        loop {
            shared.state.set(RelayState::Connecting);

            let reason = match Self::run_session(&config, &shared, &mut control_rx, &mut backoff).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Lost(reason)) => reason,
                Err(e) => e.to_string(),
            };

            shared.mark_lost();
            let delay = backoff.next_delay();
            tracing::warn!(
                reason = %reason,
                attempt = backoff.attempts(),
                retry_in_ms = delay.as_millis() as u64,
                "Broker connection lost, reconnecting"
            );

            if Self::wait_backoff(delay, &mut control_rx).await {
                break;
            }
        }

        shared.mark_lost();
        tracing::info!("Broker relay shut down");
    }

    /// Sleep out a backoff delay; returns true on shutdown
    ///
    /// Interest changes arriving meanwhile are already recorded in the watched
    /// set and picked up by the next session.
    async fn wait_backoff(delay: Duration, control_rx: &mut mpsc::Receiver<RelayCommand>) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return false,
                cmd = control_rx.recv() => match cmd {
                    Some(RelayCommand::Shutdown) | None => return true,
                    Some(_) => {}
                },
            }
        }
    }

    /// Open both connections and serve until failure or shutdown
    async fn run_session(
        config: &RedisRelayConfig,
        shared: &Shared,
        control_rx: &mut mpsc::Receiver<RelayCommand>,
        backoff: &mut ReconnectStrategy,
    ) -> RelayResult<SessionEnd> {
        let client = redis::Client::open(config.connection_info()?)?;

        let mut publisher = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut publisher).await?;

        let mut pubsub = client.get_async_pubsub().await?;
        let channels: Vec<String> = shared.watched.lock().iter().cloned().collect();
        for channel in &channels {
            pubsub.subscribe(channel).await?;
        }

        *shared.publisher.write() = Some(publisher.clone());
        shared.state.set(RelayState::Connected);
        backoff.reset();
        tracing::info!(resubscribed = channels.len(), "Broker relay connected");

        let mut heartbeat = tokio::time::interval(config.heartbeat.unwrap_or(Duration::from_secs(3600)));
        heartbeat.tick().await;

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Ok(SessionEnd::Lost("pub/sub stream ended".to_string()));
                    };
                    match msg.get_payload::<String>() {
                        Ok(payload) => shared.deliver(msg.get_channel_name(), &payload),
                        Err(e) => tracing::warn!(error = %e, "Non-text broker payload"),
                    }
                }

                _ = heartbeat.tick(), if config.heartbeat.is_some() => {
                    let ping = tokio::time::timeout(config.publish_timeout, async {
                        let pong: String = redis::cmd("PING").query_async(&mut publisher).await?;
                        Ok::<_, redis::RedisError>(pong)
                    })
                    .await;
                    match ping {
                        Ok(Ok(_)) => tracing::trace!("Broker heartbeat"),
                        Ok(Err(e)) => return Ok(SessionEnd::Lost(format!("heartbeat failed: {e}"))),
                        Err(_) => return Ok(SessionEnd::Lost("heartbeat timed out".to_string())),
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(RelayCommand::Subscribe(channel)) => {
                            drop(stream);
                            pubsub.subscribe(&channel).await?;
                            tracing::debug!(channel = %channel, "Subscribed upstream");
                            stream = pubsub.on_message();
                        }
                        Some(RelayCommand::Unsubscribe(channel)) => {
                            drop(stream);
                            pubsub.unsubscribe(&channel).await?;
                            tracing::debug!(channel = %channel, "Unsubscribed upstream");
                            stream = pubsub.on_message();
                        }
                        Some(RelayCommand::Reconnect) => {
                            return Ok(SessionEnd::Lost("publish failed".to_string()));
                        }
                        Some(RelayCommand::Shutdown) | None => return Ok(SessionEnd::Shutdown),
                    }
                }
            }
        }
    }

    async fn send_command(&self, cmd: RelayCommand) -> RelayResult<()> {
        self.control_tx
            .send(cmd)
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    fn on_publish_failure(&self) {
        self.shared.mark_lost();
        // A reconnect already pending is enough
        let _ = self.control_tx.try_send(RelayCommand::Reconnect);
    }
}

impl std::fmt::Debug for RedisRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRelay")
            .field("url", &self.config.url)
            .field("state", &self.shared.state.get())
            .finish()
    }
}

#[async_trait]
impl BrokerRelay for RedisRelay {
    async fn publish(&self, envelope: &OutboundEnvelope) -> RelayResult<()> {
        if !self.shared.state.get().is_connected() {
            return Err(RelayError::Unavailable);
        }
        let mut conn = self
            .shared
            .publisher
            .read()
            .clone()
            .ok_or(RelayError::Unavailable)?;

        let frame = RelayFrame::from_envelope(envelope);
        let payload = frame.to_json()?;

        let published = tokio::time::timeout(self.config.publish_timeout, async {
            let receivers: i64 = conn.publish(frame.channel(), payload).await?;
            Ok::<_, RelayError>(receivers)
        })
        .await;

        match published {
            Ok(Ok(receivers)) => {
                tracing::trace!(destination = %frame.channel(), receivers, "Published frame");
                Ok(())
            }
            Ok(Err(e)) => {
                if e.is_unavailable() {
                    self.on_publish_failure();
                }
                Err(e)
            }
            Err(_) => {
                self.on_publish_failure();
                Err(RelayError::Unavailable)
            }
        }
    }

    fn state(&self) -> RelayState {
        self.shared.state.get()
    }

    fn state_changes(&self) -> watch::Receiver<RelayState> {
        self.shared.state.subscribe()
    }

    fn deliveries(&self) -> broadcast::Receiver<OutboundEnvelope> {
        self.shared.deliveries_tx.subscribe()
    }

    async fn watch(&self, destination: &Destination) -> RelayResult<()> {
        let channel = destination.path();
        if self.shared.watched.lock().insert(channel.clone()) {
            self.send_command(RelayCommand::Subscribe(channel)).await?;
        }
        Ok(())
    }

    async fn unwatch(&self, destination: &Destination) -> RelayResult<()> {
        let channel = destination.path();
        if self.shared.watched.lock().remove(&channel) {
            self.send_command(RelayCommand::Unsubscribe(channel)).await?;
        }
        Ok(())
    }

    async fn shutdown(&self) -> RelayResult<()> {
        self.send_command(RelayCommand::Shutdown).await
    }
}
