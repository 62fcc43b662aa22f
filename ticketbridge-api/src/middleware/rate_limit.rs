//! Rate Limiting Middleware
//!
//! One keyed governor limiter shared by every client IP. Runs outside
//! authentication so unauthenticated floods are throttled too. Proxy headers
//! only pick the client key when `trust_proxy_headers` is set; otherwise the
//! socket address does. Idle keys are dropped by the periodic sweep.

use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use ticketbridge_storage::Sweep;

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl std::fmt::Debug for RateLimitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitState")
            .field("per_minute", &self.config.rate_limit_per_minute)
            .field("burst", &self.config.rate_limit_burst)
            .field("trust_proxy_headers", &self.config.trust_proxy_headers)
            .field("clients", &self.limiter.len())
            .finish()
    }
}

impl RateLimitState {
    pub fn new(config: Arc<ApiConfig>) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.rate_limit_burst).unwrap_or(NonZeroU32::MIN));

        Self {
            config,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

/// Keys whose budget has fully refilled look like fresh clients and are
/// dropped.
impl Sweep for RateLimitState {
    fn store_name(&self) -> &'static str {
        "rate_limiter"
    }

    fn sweep_expired(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }

    fn len(&self) -> usize {
        self.limiter.len()
    }
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until a request would be admitted
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(ApiError::rate_limited(self.retry_after)),
        )
            .into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract the client IP used as the rate limit key.
///
/// `X-Forwarded-For` (first entry) and `X-Real-IP` are consulted only when
/// the service sits behind a proxy that sets them.
fn extract_client_ip(request: &Request, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(forwarded_for) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
        {
            if let Some(Ok(ip)) = forwarded_for.split(',').next().map(|ip| ip.trim().parse()) {
                return ip;
            }
        }

        if let Some(Ok(ip)) = request
            .headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(|ip| ip.trim().parse())
        {
            return ip;
        }
    }

    // Connection address, absent when the router is driven without a listener
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware.
///
/// When limited, returns 429 `RATE_LIMIT_EXCEEDED` with a `Retry-After`
/// header; otherwise adds `x-ratelimit-limit` to the response.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let ip = extract_client_ip(&request, state.config.trust_proxy_headers);

    match state.limiter.check_key(&ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.config.rate_limit_per_minute),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}
