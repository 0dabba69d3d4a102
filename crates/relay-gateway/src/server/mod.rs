//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod http;
mod state;

pub use handler::gateway_handler;
pub use http::{ApiError, AuthUser, HealthResponse, MeResponse, UserListing};
pub use state::{GatewayState, GatewayStateBuilder};

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use relay_broker::{LocalRelay, RedisRelay, RedisRelayConfig, SharedRelay};
use relay_common::{AppConfig, AppError, AppResult, BrokerMode};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(http::health_check))
        .route("/users", get(http::list_users))
        .route("/all/user", get(http::list_users))
        .route("/me", get(http::me))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    let cors = create_cors_layer(&state.config().gateway.allowed_origins);

    create_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the HTTP endpoints
///
/// Any origin is allowed when none are configured.
fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.is_empty() {
        return base_layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS: Allowing {} configured origins", origins.len());
    base_layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the broker relay selected by configuration
pub fn create_relay(config: &AppConfig) -> SharedRelay {
    match config.broker.mode {
        BrokerMode::Local => {
            tracing::info!("Using in-process broker relay");
            Arc::new(LocalRelay::new(config.broker.delivery_buffer))
        }
        BrokerMode::Redis => {
            tracing::info!(url = %config.broker.url, "Connecting broker relay to Redis");
            Arc::new(RedisRelay::connect(RedisRelayConfig::from(&config.broker)))
        }
    }
}

/// Initialize all dependencies and create `GatewayState`
///
/// The delivery dispatcher is running when this returns.
pub async fn create_gateway_state(config: AppConfig) -> AppResult<GatewayState> {
    if config.gateway.outbound_buffer == 0 {
        return Err(AppError::Config(
            "GATEWAY_OUTBOUND_BUFFER must be greater than zero".to_string(),
        ));
    }

    let relay = create_relay(&config);
    let state = GatewayState::builder(config, relay).build();
    state.dispatcher().start();

    Ok(state)
}

/// Run the gateway server on an already bound listener
pub async fn serve(listener: TcpListener, state: GatewayState) -> AppResult<()> {
    let relay = state.relay().clone();
    let dispatcher = state.dispatcher().clone();
    let app = create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Server error"))?;

    tracing::info!("Shutting down broker relay");
    dispatcher.stop();
    if let Err(e) = relay.shutdown().await {
        tracing::warn!(error = %e, "Relay shutdown failed");
    }

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.gateway.address();

    let state = create_gateway_state(config).await?;

    tracing::info!("Starting Gateway server on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .inspect_err(|e| tracing::error!(addr = %addr, error = %e, "Failed to bind"))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    serve(listener, state).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
