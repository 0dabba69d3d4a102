//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub broker: BrokerConfig,
    pub delivery: DeliveryConfig,
    pub jwt: JwtConfig,
    pub directory: DirectoryConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// WebSocket gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Heartbeat interval advertised in Hello
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Per-connection outbound channel capacity
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl GatewayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which broker the relay talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerMode {
    /// In-process loopback broker (single instance)
    #[default]
    Local,
    /// External Redis pub/sub broker
    Redis,
}

/// Upstream broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub mode: BrokerMode,
    #[serde(default = "default_broker_url")]
    pub url: String,
    pub login: Option<String>,
    pub passcode: Option<String>,
    /// Upstream heartbeat (PING) interval
    #[serde(default = "default_broker_heartbeat_ms")]
    pub heartbeat_ms: u64,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Capacity of the in-process delivery fan-out channel
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            mode: BrokerMode::default(),
            url: default_broker_url(),
            login: None,
            passcode: None,
            heartbeat_ms: default_broker_heartbeat_ms(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            delivery_buffer: default_delivery_buffer(),
        }
    }
}

/// Advisory hints attached to private envelopes
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_auto_delete")]
    pub auto_delete: bool,
    /// `None` disables the TTL header
    #[serde(default = "default_message_ttl_ms")]
    pub message_ttl_ms: Option<u64>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            auto_delete: default_auto_delete(),
            message_ttl_ms: default_message_ttl_ms(),
        }
    }
}

impl From<DeliveryConfig> for relay_core::DeliveryHints {
    fn from(config: DeliveryConfig) -> Self {
        Self {
            auto_delete: config.auto_delete,
            message_ttl_ms: config.message_ttl_ms,
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Static user directory configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub users: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    60_000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_broker_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_broker_heartbeat_ms() -> u64 {
    10_000
}

fn default_reconnect_initial_ms() -> u64 {
    1000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_delivery_buffer() -> usize {
    1024
}

fn default_auto_delete() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)]
fn default_message_ttl_ms() -> Option<u64> {
    Some(6000)
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "GATEWAY_PORT").ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
                heartbeat_interval_ms: parse_var(&lookup, "GATEWAY_HEARTBEAT_INTERVAL_MS")
                    .unwrap_or_else(default_heartbeat_interval_ms),
                outbound_buffer: parse_var(&lookup, "GATEWAY_OUTBOUND_BUFFER")
                    .unwrap_or_else(default_outbound_buffer),
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|s| parse_list(&s))
                    .unwrap_or_default(),
            },
            broker: BrokerConfig {
                mode: match lookup("BROKER_MODE") {
                    None => BrokerMode::default(),
                    Some(s) => match s.to_lowercase().as_str() {
                        "local" => BrokerMode::Local,
                        "redis" => BrokerMode::Redis,
                        _ => return Err(ConfigError::InvalidValue("BROKER_MODE", s)),
                    },
                },
                url: lookup("BROKER_URL").unwrap_or_else(default_broker_url),
                login: lookup("BROKER_LOGIN"),
                passcode: lookup("BROKER_PASSCODE"),
                heartbeat_ms: parse_var(&lookup, "BROKER_HEARTBEAT_MS")
                    .unwrap_or_else(default_broker_heartbeat_ms),
                reconnect_initial_ms: parse_var(&lookup, "BROKER_RECONNECT_INITIAL_MS")
                    .unwrap_or_else(default_reconnect_initial_ms),
                reconnect_max_ms: parse_var(&lookup, "BROKER_RECONNECT_MAX_MS")
                    .unwrap_or_else(default_reconnect_max_ms),
                delivery_buffer: parse_var(&lookup, "BROKER_DELIVERY_BUFFER")
                    .unwrap_or_else(default_delivery_buffer),
            },
            delivery: DeliveryConfig {
                auto_delete: parse_var(&lookup, "DELIVERY_AUTO_DELETE").unwrap_or_else(default_auto_delete),
                // 0 disables the TTL header
                message_ttl_ms: match parse_var::<u64>(&lookup, "DELIVERY_MESSAGE_TTL_MS") {
                    Some(0) => None,
                    Some(ttl) => Some(ttl),
                    None => default_message_ttl_ms(),
                },
            },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                access_token_expiry: parse_var(&lookup, "JWT_ACCESS_TOKEN_EXPIRY")
                    .unwrap_or_else(default_access_token_expiry),
            },
            directory: DirectoryConfig {
                users: lookup("CHAT_USERS")
                    .map(|s| parse_list(&s))
                    .unwrap_or_default(),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
