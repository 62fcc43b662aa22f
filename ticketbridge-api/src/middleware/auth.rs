//! Axum Middleware for Authentication
//!
//! Runs the [`Authenticator`] against every request on the protected routes.
//! In signed-webhook mode the body is buffered first so the HMAC covers the
//! exact bytes received, then handed on unchanged. On success an
//! [`AuthContext`] is injected into the request extensions.

use crate::auth::{AuthContext, AuthMode, Authenticator, Credentials};
use crate::error::ApiError;
use crate::telemetry::with_metrics;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub authenticator: Arc<Authenticator>,
    /// Cap on the buffered body in signed-webhook mode
    pub max_body_bytes: usize,
}

impl AuthMiddlewareState {
    pub fn new(authenticator: Arc<Authenticator>, max_body_bytes: usize) -> Self {
        Self {
            authenticator,
            max_body_bytes,
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Axum middleware for authentication.
///
/// Missing credentials answer 401 `AUTH_REQUIRED`, malformed ones 401
/// `INVALID_TOKEN`/`INVALID_SIGNATURE`, and well-formed credentials that fail
/// verification 403 `AUTH_FAILED`.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    if state.authenticator.mode() == AuthMode::SharedSecret {
        let credentials = Credentials::from_headers(request.headers());
        let context = check(&state, &credentials, &[], request.uri().path())?;
        request.extensions_mut().insert(context);
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            AuthMiddlewareError(ApiError::validation(format!(
                "Failed to read request body: {}",
                e
            )))
        })?;

    let credentials = Credentials::from_headers(&parts.headers);
    let context = check(&state, &credentials, &body_bytes, parts.uri.path())?;
    parts.extensions.insert(context);

    Ok(next.run(Request::from_parts(parts, Body::from(body_bytes))).await)
}

fn check(
    state: &AuthMiddlewareState,
    credentials: &Credentials<'_>,
    body: &[u8],
    path: &str,
) -> Result<AuthContext, AuthMiddlewareError> {
    state
        .authenticator
        .authenticate(credentials, body)
        .map_err(|err| {
            let reason = err.reason_label();
            with_metrics(|m| m.record_auth_failure(reason));
            tracing::warn!(
                reason = reason,
                path = %path,
                mode = %state.authenticator.mode(),
                "Authentication rejected"
            );
            AuthMiddlewareError(ApiError::from(err))
        })
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Error type for authentication middleware.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<ApiError> for AuthMiddlewareError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Extractor for the [`AuthContext`] set by [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .map(AuthExtractor)
            .ok_or_else(|| ApiError::internal("Auth context missing, ensure auth middleware runs first"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
