//! TicketBridge API Server Entry Point
//!
//! Loads configuration from the environment, spawns the store sweepers and
//! serves the Axum router until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use ticketbridge_api::constants::DEFAULT_PORT;
use ticketbridge_api::telemetry::{init_tracing, TelemetryConfig};
use ticketbridge_api::{
    build_router, helpdesk, spawn_sweepers, ApiConfig, ApiError, ApiResult, AppState, AuthConfig,
    CacheConfig, HelpdeskConfig,
};
use ticketbridge_core::{Clock, SystemClock};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let auth_config = AuthConfig::from_env()?;
    auth_config.validate()?;

    let api_config = ApiConfig::from_env();
    let cache_config = CacheConfig::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let helpdesk = helpdesk::from_config(&HelpdeskConfig::from_env(), clock.clone())?;

    let state = AppState::new(api_config, auth_config, cache_config, helpdesk, clock);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweepers = spawn_sweepers(state.sweep_schedule(), shutdown_rx);

    let app = build_router(state, telemetry_config.metrics_enabled);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting TicketBridge API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
    })
    .await
    .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    for handle in sweepers {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Sweep task ended abnormally");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// `TICKETBRIDGE_BIND` takes a full `host:port`; otherwise listen on all
/// interfaces at `PORT`.
fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    if let Ok(bind) = std::env::var("TICKETBRIDGE_BIND") {
        return bind
            .parse::<SocketAddr>()
            .map_err(|e| ApiError::validation(format!("Invalid bind address {}: {}", bind, e)));
    }

    let port = match std::env::var("PORT") {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| ApiError::validation(format!("Invalid port value: {}", value)))?,
        Err(_) => DEFAULT_PORT,
    };

    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}
