//! REST API Routes Module
//!
//! - `POST /api/v1/escalations`: escalation ingest (idempotent with a key)
//! - `GET /api/v1/tools`, `POST /api/v1/tools/call`: tool entry points
//! - `/health/*`: Kubernetes-compatible health checks (public)
//! - `/metrics`: Prometheus scrape endpoint (public)
//! - `/api-docs/openapi.json`: OpenAPI document (`openapi` feature)

pub mod health;
pub mod ingest;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, header::HeaderName, request::Parts, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::constants::{
    AUTH_TOKEN_HEADER, IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_REPLAY_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
use crate::middleware::{auth_middleware, idempotency_middleware, rate_limit_middleware};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - answers preflight requests
/// 2. Observability - span, request metrics, tower-http trace events
/// 3. Rate limiting - rejects floods before any credential work
/// 4. Auth (only on /api/v1/*)
/// 5. Idempotency (only on the ingest route)
pub fn build_router(state: AppState, metrics_enabled: bool) -> Router {
    let ingest_route = post(ingest::ingest_escalation).layer(from_fn_with_state(
        state.idempotency_state(),
        idempotency_middleware,
    ));

    let api_routes = Router::new()
        .route("/escalations", ingest_route)
        .route("/tools", get(tools::list_tools))
        .route("/tools/call", post(tools::call_tool))
        .layer(from_fn_with_state(state.auth_middleware_state(), auth_middleware));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router());

    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    #[cfg(feature = "openapi")]
    {
        router = router.route("/api-docs/openapi.json", get(crate::openapi::openapi_json));
    }

    let cors = build_cors_layer(state.api_config.clone());
    let rate_limit_state = state.rate_limit_state();
    let max_body_bytes = state.api_config.max_body_bytes;

    router
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(from_fn(observability_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware))
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// An empty origin list allows every origin; otherwise origins are matched
/// with [`ApiConfig::is_origin_allowed`], which understands `*.` wildcards.
fn build_cors_layer(config: Arc<ApiConfig>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(AUTH_TOKEN_HEADER),
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
            HeaderName::from_static(IDEMPOTENCY_REPLAY_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: no origins configured, allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        cors.allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| config.is_origin_allowed(origin))
                    .unwrap_or(false)
            },
        ))
    }
}
