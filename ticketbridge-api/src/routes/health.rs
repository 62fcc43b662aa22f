//! Probe endpoints for load balancers and orchestrators.
//!
//! `/health/ping` and `/health/live` only prove the process answers.
//! `/health/ready` also asks the helpdesk backend and reports 503 while it
//! is unreachable. None of them require credentials.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use ticketbridge_core::HelpdeskCapability;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub helpdesk: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    /// Backend name (`http` or `memory`)
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
))]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
))]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Helpdesk is unreachable", body = HealthResponse),
    ),
))]
pub async fn readiness(
    State(helpdesk): State<Arc<dyn HelpdeskCapability>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let start = Instant::now();
    let healthy = helpdesk.health_check().await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status = if healthy {
        HealthStatus::Healthy
    } else {
        tracing::warn!(helpdesk = helpdesk.name(), "Readiness check failed: helpdesk unhealthy");
        HealthStatus::Unhealthy
    };

    let response = HealthResponse {
        status,
        message: (!healthy).then(|| "Helpdesk is not reachable".to_string()),
        details: Some(HealthDetails {
            helpdesk: ComponentHealth {
                status,
                backend: helpdesk.name().to_string(),
                latency_ms: Some(latency_ms),
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Probe routes, mounted under `/health` without the auth layer.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::config::{ApiConfig, CacheConfig};
    use crate::helpdesk::InMemoryHelpdesk;
    use axum::body::Body;
    use ticketbridge_core::ManualClock;
    use tower::ServiceExt;

    fn app(helpdesk: Arc<InMemoryHelpdesk>) -> Router {
        let state = AppState::new(
            ApiConfig::default(),
            AuthConfig::shared_secret("tok"),
            CacheConfig::default(),
            helpdesk,
            Arc::new(ManualClock::default()),
        );
        Router::new().nest("/health", create_router()).with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> Result<(StatusCode, serde_json::Value), String> {
        let response = app
            .oneshot(
                axum::http::Request::get(uri)
                    .body(Body::empty())
                    .map_err(|e| e.to_string())?,
            )
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        Ok((status, json))
    }

    #[tokio::test]
    async fn test_ping_and_live() -> Result<(), String> {
        let helpdesk = Arc::new(InMemoryHelpdesk::new("http://desk.local", Arc::new(ManualClock::default())));
        let (status, _) = get_json(app(helpdesk.clone()), "/health/ping").await?;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(app(helpdesk), "/health/live").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_reflects_helpdesk_health() -> Result<(), String> {
        let helpdesk = Arc::new(InMemoryHelpdesk::new("http://desk.local", Arc::new(ManualClock::default())));

        let (status, body) = get_json(app(helpdesk.clone()), "/health/ready").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["details"]["helpdesk"]["backend"], "memory");

        helpdesk.set_healthy(false);
        let (status, body) = get_json(app(helpdesk), "/health/ready").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        Ok(())
    }

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: None,
            details: None,
        };
        let json = serde_json::to_string(&response)?;
        assert_eq!(json, r#"{"status":"healthy"}"#);
        Ok(())
    }
}
