//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BrokerConfig, BrokerMode, ConfigError, DeliveryConfig,
    DirectoryConfig, Environment, GatewayConfig, JwtConfig,
};
