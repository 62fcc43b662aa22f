//! API Configuration Module
//!
//! CORS, rate limiting, request limits, cache lifetimes and the helpdesk
//! backend. Everything is loaded from `TICKETBRIDGE_*` environment variables
//! with development-friendly defaults. Authentication settings live in
//! [`crate::auth::AuthConfig`].

use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;
use ticketbridge_storage::IdempotencyConfig;

use crate::constants::{
    DEFAULT_HELPDESK_TIMEOUT_SECS, DEFAULT_IDEMPOTENCY_MAX_KEYS, DEFAULT_IDEMPOTENCY_SWEEP_SECS,
    DEFAULT_IDEMPOTENCY_TTL_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_RATE_LIMIT_BURST,
    DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_REPLAY_SWEEP_SECS, DEFAULT_TICKET_SWEEP_SECS,
    DEFAULT_TICKET_TTL_SECS,
};

/// Parse an environment variable, falling back to `default` when it is unset
/// or does not parse. A value that does not parse is logged.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Unparseable environment value, using default");
            default
        }
    }
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_or(key, default))
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, rate limiting and request limits.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Requests per minute per client IP.
    pub rate_limit_per_minute: u32,

    /// Burst capacity on top of the steady rate.
    pub rate_limit_burst: u32,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the socket
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,

    // ========================================================================
    // Request limits
    // ========================================================================
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            rate_limit_enabled: true,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            trust_proxy_headers: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TICKETBRIDGE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TICKETBRIDGE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `TICKETBRIDGE_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `TICKETBRIDGE_RATE_LIMIT_PER_MINUTE`: Requests per minute per IP (default: 120)
    /// - `TICKETBRIDGE_RATE_LIMIT_BURST`: Burst capacity (default: 20)
    /// - `TICKETBRIDGE_TRUST_PROXY_HEADERS`: "true" to key clients by forwarded headers (default: false)
    /// - `TICKETBRIDGE_MAX_BODY_BYTES`: Request body cap (default: 1 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("TICKETBRIDGE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cors_origins,
            cors_max_age_secs: env_or("TICKETBRIDGE_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs),
            rate_limit_enabled: std::env::var("TICKETBRIDGE_RATE_LIMIT_ENABLED")
                .ok()
                .map(|s| s.trim().to_lowercase() != "false")
                .unwrap_or(defaults.rate_limit_enabled),
            rate_limit_per_minute: env_or(
                "TICKETBRIDGE_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            rate_limit_burst: env_or("TICKETBRIDGE_RATE_LIMIT_BURST", defaults.rate_limit_burst),
            trust_proxy_headers: env_or(
                "TICKETBRIDGE_TRUST_PROXY_HEADERS",
                defaults.trust_proxy_headers,
            ),
            max_body_bytes: env_or("TICKETBRIDGE_MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Lifetimes and sweep intervals of the in-memory stores.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub idempotency_ttl: Duration,
    pub idempotency_sweep_interval: Duration,
    pub idempotency_max_keys: usize,
    pub ticket_ttl: Duration,
    pub ticket_sweep_interval: Duration,
    pub replay_sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl: Duration::from_secs(DEFAULT_IDEMPOTENCY_TTL_SECS),
            idempotency_sweep_interval: Duration::from_secs(DEFAULT_IDEMPOTENCY_SWEEP_SECS),
            idempotency_max_keys: DEFAULT_IDEMPOTENCY_MAX_KEYS,
            ticket_ttl: Duration::from_secs(DEFAULT_TICKET_TTL_SECS),
            ticket_sweep_interval: Duration::from_secs(DEFAULT_TICKET_SWEEP_SECS),
            replay_sweep_interval: Duration::from_secs(DEFAULT_REPLAY_SWEEP_SECS),
        }
    }
}

impl CacheConfig {
    /// Environment variables (seconds unless noted):
    /// - `TICKETBRIDGE_IDEMPOTENCY_TTL_SECS` (900)
    /// - `TICKETBRIDGE_IDEMPOTENCY_SWEEP_SECS` (300)
    /// - `TICKETBRIDGE_IDEMPOTENCY_MAX_KEYS` (10000, count)
    /// - `TICKETBRIDGE_TICKET_TTL_SECS` (14400)
    /// - `TICKETBRIDGE_TICKET_SWEEP_SECS` (1800)
    /// - `TICKETBRIDGE_REPLAY_SWEEP_SECS` (60)
    pub fn from_env() -> Self {
        Self {
            idempotency_ttl: env_secs("TICKETBRIDGE_IDEMPOTENCY_TTL_SECS", DEFAULT_IDEMPOTENCY_TTL_SECS),
            idempotency_sweep_interval: env_secs(
                "TICKETBRIDGE_IDEMPOTENCY_SWEEP_SECS",
                DEFAULT_IDEMPOTENCY_SWEEP_SECS,
            ),
            idempotency_max_keys: env_or(
                "TICKETBRIDGE_IDEMPOTENCY_MAX_KEYS",
                DEFAULT_IDEMPOTENCY_MAX_KEYS,
            ),
            ticket_ttl: env_secs("TICKETBRIDGE_TICKET_TTL_SECS", DEFAULT_TICKET_TTL_SECS),
            ticket_sweep_interval: env_secs("TICKETBRIDGE_TICKET_SWEEP_SECS", DEFAULT_TICKET_SWEEP_SECS),
            replay_sweep_interval: env_secs("TICKETBRIDGE_REPLAY_SWEEP_SECS", DEFAULT_REPLAY_SWEEP_SECS),
        }
    }

    /// Settings for the idempotency cache.
    pub fn idempotency(&self) -> IdempotencyConfig {
        IdempotencyConfig {
            ttl: self.idempotency_ttl,
            max_keys: self.idempotency_max_keys,
        }
    }
}

// ============================================================================
// HELPDESK CONFIGURATION
// ============================================================================

/// Where tickets go.
#[derive(Debug, Clone)]
pub struct HelpdeskConfig {
    /// Base URL of the helpdesk JSON API. `None` selects the in-memory backend.
    pub url: Option<String>,
    /// Bearer token sent to the helpdesk.
    pub api_key: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Base used to build ticket URLs for the in-memory backend.
    pub memory_base_url: String,
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_HELPDESK_TIMEOUT_SECS),
            memory_base_url: "http://localhost:8080/helpdesk".to_string(),
        }
    }
}

impl HelpdeskConfig {
    /// Environment variables:
    /// - `TICKETBRIDGE_HELPDESK_URL`: Base URL (unset = in-memory helpdesk)
    /// - `TICKETBRIDGE_HELPDESK_API_KEY`: Bearer token
    /// - `TICKETBRIDGE_HELPDESK_TIMEOUT_SECS`: Request timeout (default: 10)
    /// - `TICKETBRIDGE_HELPDESK_MEMORY_BASE_URL`: Ticket URL base for the in-memory helpdesk
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            url: non_empty("TICKETBRIDGE_HELPDESK_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key: non_empty("TICKETBRIDGE_HELPDESK_API_KEY").map(SecretString::from),
            timeout: env_secs(
                "TICKETBRIDGE_HELPDESK_TIMEOUT_SECS",
                DEFAULT_HELPDESK_TIMEOUT_SECS,
            ),
            memory_base_url: non_empty("TICKETBRIDGE_HELPDESK_MEMORY_BASE_URL")
                .unwrap_or(defaults.memory_base_url),
        }
    }

    /// True when tickets stay in process memory.
    pub fn uses_memory_backend(&self) -> bool {
        self.url.is_none()
    }
}
