//! Idempotency Middleware
//!
//! Request-level replay for the ingest route. A client that retries with the
//! same `Idempotency-Key` and the same body gets back the first response
//! byte for byte; the same key with a different body is a 409.
//!
//! 1. No key header: pass through untouched
//! 2. Key seen with matching request hash: replay the cached response
//! 3. Key seen with a different hash: 409 `IDEMPOTENCY_CONFLICT`
//! 4. New key: run the handler and cache the response if its status is < 500

use crate::constants::{IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_REPLAY_HEADER, MAX_IDEMPOTENCY_KEY_LEN};
use crate::error::{ApiError, ErrorCode};
use crate::telemetry::with_metrics;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use ticketbridge_core::{IdempotencyConflict, PayloadHash};
use ticketbridge_storage::{IdempotencyCache, IdempotencyCheck};

// ============================================================================
// STATE
// ============================================================================

/// Shared state for idempotency middleware.
#[derive(Debug, Clone)]
pub struct IdempotencyState {
    pub cache: Arc<IdempotencyCache>,
    /// Cap on buffered request and response bodies
    pub max_body_bytes: usize,
}

impl IdempotencyState {
    pub fn new(cache: Arc<IdempotencyCache>, max_body_bytes: usize) -> Self {
        Self {
            cache,
            max_body_bytes,
        }
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Axum middleware for idempotency key handling.
pub async fn idempotency_middleware(
    State(state): State<IdempotencyState>,
    request: Request,
    next: Next,
) -> Result<Response, IdempotencyError> {
    let idempotency_key = match request.headers().get(IDEMPOTENCY_KEY_HEADER) {
        None => return Ok(next.run(request).await),
        Some(value) => parse_key(value)?,
    };

    let method = request.method().clone();
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| IdempotencyError::Body(e.to_string()))?;

    let request_hash = compute_request_hash(&method, parts.uri.path(), &body_bytes);

    match state.cache.check(&idempotency_key, &request_hash)? {
        IdempotencyCheck::Hit(record) => {
            tracing::debug!(
                idempotency_key = %idempotency_key,
                status = record.status_code,
                "Returning cached response for idempotency key"
            );
            with_metrics(|m| m.record_idempotency("replay"));
            replay(record.status_code, record.response)
        }
        IdempotencyCheck::Miss => {
            let request = Request::from_parts(parts, Body::from(body_bytes));
            let response = next.run(request).await;

            let (resp_parts, resp_body) = response.into_parts();
            let resp_bytes = axum::body::to_bytes(resp_body, state.max_body_bytes)
                .await
                .map_err(|e| {
                    IdempotencyError::Internal(format!("Failed to buffer response body: {}", e))
                })?;

            let status = resp_parts.status.as_u16();
            if status < 500 {
                match state.cache.store(
                    &idempotency_key,
                    request_hash,
                    resp_bytes.to_vec(),
                    status,
                ) {
                    Ok(()) => with_metrics(|m| m.record_idempotency("stored")),
                    // A concurrent request claimed the key with another body
                    // while this one ran; the response already went out.
                    Err(conflict) => {
                        tracing::warn!(
                            idempotency_key = %conflict.key,
                            "Idempotency key claimed by a concurrent request, response not cached"
                        );
                        with_metrics(|m| m.record_idempotency("conflict"));
                    }
                }
            }

            Ok(Response::from_parts(resp_parts, Body::from(resp_bytes)))
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn parse_key(value: &HeaderValue) -> Result<String, IdempotencyError> {
    let key = value
        .to_str()
        .map_err(|_| IdempotencyError::InvalidKey("Idempotency key must be visible ASCII".to_string()))?;
    let chars = key.chars().count();
    if chars == 0 || chars > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(IdempotencyError::InvalidKey(format!(
            "Idempotency key must be 1-{} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok(key.to_string())
}

/// Compute SHA-256 hash of method + path + body.
fn compute_request_hash(method: &Method, path: &str, body: &Bytes) -> PayloadHash {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(path.as_bytes());
    hasher.update(b"|");
    hasher.update(body);
    hasher.finalize().into()
}

fn replay(status: u16, body: Vec<u8>) -> Result<Response, IdempotencyError> {
    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Response::builder()
        .status(status_code)
        .header(header::CONTENT_TYPE, "application/json")
        .header(IDEMPOTENCY_REPLAY_HEADER, "true")
        .body(Body::from(body))
        .map_err(|e| IdempotencyError::Internal(format!("Failed to build response: {}", e)))
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Errors that can occur in idempotency middleware.
#[derive(Debug)]
pub enum IdempotencyError {
    /// Key header is empty, too long or not valid text
    InvalidKey(String),

    /// Request body could not be buffered
    Body(String),

    /// Key exists but request hash doesn't match
    Conflict(IdempotencyConflict),

    Internal(String),
}

impl From<IdempotencyConflict> for IdempotencyError {
    fn from(conflict: IdempotencyConflict) -> Self {
        IdempotencyError::Conflict(conflict)
    }
}

impl From<IdempotencyError> for ApiError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::InvalidKey(msg) => ApiError::validation(msg)
                .with_details(serde_json::json!({ "field": IDEMPOTENCY_KEY_HEADER })),
            IdempotencyError::Body(msg) => {
                ApiError::new(ErrorCode::ValidationError, format!("Failed to read request body: {}", msg))
            }
            IdempotencyError::Conflict(conflict) => ApiError::from(conflict),
            IdempotencyError::Internal(msg) => ApiError::internal(msg),
        }
    }
}

impl IntoResponse for IdempotencyError {
    fn into_response(self) -> Response {
        if let IdempotencyError::Conflict(conflict) = &self {
            tracing::info!(idempotency_key = %conflict.key, "Idempotency key reused with a different payload");
            with_metrics(|m| m.record_idempotency("conflict"));
        }
        ApiError::from(self).into_response()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use ticketbridge_core::ManualClock;
    use ticketbridge_storage::IdempotencyConfig;
    use tower::ServiceExt;

    fn cache(clock: Arc<ManualClock>) -> Arc<IdempotencyCache> {
        Arc::new(IdempotencyCache::new(IdempotencyConfig::default(), clock))
    }

    /// Echo handler that counts invocations and answers with `status`.
    fn app(cache: Arc<IdempotencyCache>, calls: Arc<AtomicUsize>, status: StatusCode) -> Router {
        let state = IdempotencyState::new(cache, 1024);
        Router::new()
            .route(
                "/ingest",
                post(move |body: String| {
                    let calls = calls.clone();
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        (status, format!("{{\"call\":{},\"body\":{:?}}}", n, body))
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(state, idempotency_middleware))
    }

    fn request(key: Option<&str>, body: &str) -> Result<axum::http::Request<Body>, String> {
        let mut builder = axum::http::Request::post("/ingest");
        if let Some(key) = key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        builder
            .body(Body::from(body.to_string()))
            .map_err(|e| e.to_string())
    }

    async fn send(app: &Router, req: axum::http::Request<Body>) -> Result<(StatusCode, Option<HeaderValue>, Bytes), String> {
        let response = app.clone().oneshot(req).await.map_err(|e| e.to_string())?;
        let status = response.status();
        let replay = response.headers().get(IDEMPOTENCY_REPLAY_HEADER).cloned();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok((status, replay, bytes))
    }

    #[tokio::test]
    async fn test_same_key_same_body_replays_byte_identical() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(cache(clock), calls.clone(), StatusCode::OK);

        let (s1, r1, b1) = send(&app, request(Some("k-1"), "a")?).await?;
        let (s2, r2, b2) = send(&app, request(Some("k-1"), "a")?).await?;

        assert_eq!(s1, StatusCode::OK);
        assert_eq!(s2, StatusCode::OK);
        assert!(r1.is_none());
        assert_eq!(r2.as_ref().map(|v| v.as_bytes()), Some(&b"true"[..]));
        assert_eq!(b1, b2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_same_key_different_body_conflicts() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(cache(clock), calls.clone(), StatusCode::OK);

        send(&app, request(Some("k-2"), "a")?).await?;
        let (status, _, body) = send(&app, request(Some("k-2"), "b")?).await?;

        assert_eq!(status, StatusCode::CONFLICT);
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["code"], "IDEMPOTENCY_CONFLICT");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_key_bypasses_cache() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache(clock);
        let app = app(cache.clone(), calls.clone(), StatusCode::OK);

        send(&app, request(None, "a")?).await?;
        send(&app, request(None, "a")?).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.get("a").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_server_errors_are_not_cached() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache(clock);
        let app = app(cache.clone(), calls.clone(), StatusCode::BAD_GATEWAY);

        send(&app, request(Some("k-3"), "a")?).await?;
        let (_, replay, _) = send(&app, request(Some("k-3"), "a")?).await?;

        assert!(replay.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.get("k-3").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_client_errors_are_cached() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(cache(clock), calls.clone(), StatusCode::BAD_REQUEST);

        send(&app, request(Some("k-4"), "a")?).await?;
        let (status, replay, _) = send(&app, request(Some("k-4"), "a")?).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(replay.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_key_runs_handler_again() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(cache(clock.clone()), calls.clone(), StatusCode::OK);

        send(&app, request(Some("k-5"), "a")?).await?;
        clock.advance(Duration::from_secs(15 * 60));
        let (_, replay, _) = send(&app, request(Some("k-5"), "b")?).await?;

        assert!(replay.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(cache(clock), calls.clone(), StatusCode::OK);

        let long = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1);
        let (status, _, _) = send(&app, request(Some(&long), "a")?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, request(Some(""), "a")?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let max = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN);
        let (status, _, _) = send(&app, request(Some(&max), "a")?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_compute_request_hash_different_for_different_inputs() {
        let body = Bytes::from(r#"{"note": "x"}"#);
        let hash1 = compute_request_hash(&Method::POST, "/api/v1/escalations", &body);
        assert_eq!(hash1, compute_request_hash(&Method::POST, "/api/v1/escalations", &body));
        assert_ne!(hash1, compute_request_hash(&Method::PUT, "/api/v1/escalations", &body));
        assert_ne!(hash1, compute_request_hash(&Method::POST, "/api/v1/other", &body));
        assert_ne!(
            hash1,
            compute_request_hash(&Method::POST, "/api/v1/escalations", &Bytes::from("{}"))
        );
    }
}
