//! Authentication Module
//!
//! Two mutually exclusive modes:
//!
//! 1. Shared secret: the caller sends `x-auth-token`, compared in constant
//!    time against `TICKETBRIDGE_AUTH_TOKEN`.
//! 2. Signed webhook: the caller sends `x-timestamp` (Unix seconds) and
//!    `x-signature` = `hex(HMAC-SHA256(secret, timestamp || body))`, optionally
//!    prefixed with `sha256=`. Accepted signatures are remembered in a
//!    [`ReplayGuard`] for the length of the timestamp window.
//!
//! A missing secret for the active mode fails closed.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_core::{AuthError, Clock, ConfigError};
use ticketbridge_storage::ReplayGuard;

use crate::config::env_or;
use crate::constants::{
    AUTH_TOKEN_HEADER, DEFAULT_REPLAY_WINDOW_SECS, SIGNATURE_HEADER, SIGNATURE_PREFIX,
    TIMESTAMP_HEADER,
};

type HmacSha256 = Hmac<Sha256>;

/// Label mixed into token comparisons so both sides go through the same MAC.
const TOKEN_COMPARE_LABEL: &[u8] = b"ticketbridge-token-compare";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Which credential scheme callers must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SharedSecret,
    SignedWebhook,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::SharedSecret => "shared_secret",
            AuthMode::SignedWebhook => "signed_webhook",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "shared_secret" => Ok(AuthMode::SharedSecret),
            "signed_webhook" => Ok(AuthMode::SignedWebhook),
            _ => Err(ConfigError::InvalidValue {
                field: "TICKETBRIDGE_AUTH_MODE".to_string(),
                value: s.to_string(),
                reason: "expected shared_secret or signed_webhook".to_string(),
            }),
        }
    }
}

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Shared secret for `x-auth-token`
    pub token: Option<SecretString>,
    /// HMAC key for signed webhooks
    pub webhook_secret: Option<SecretString>,
    /// Accepted timestamp skew, also the replay guard lifetime
    pub replay_window: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("replay_window", &self.replay_window)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            token: None,
            webhook_secret: None,
            replay_window: Duration::from_secs(DEFAULT_REPLAY_WINDOW_SECS),
        }
    }
}

impl AuthConfig {
    /// Shared-secret configuration with the given token.
    pub fn shared_secret(token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::SharedSecret,
            token: Some(SecretString::from(token.into())),
            ..Self::default()
        }
    }

    /// Signed-webhook configuration with the given HMAC key.
    pub fn signed_webhook(secret: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::SignedWebhook,
            webhook_secret: Some(SecretString::from(secret.into())),
            ..Self::default()
        }
    }

    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `TICKETBRIDGE_AUTH_MODE`: `shared_secret` (default) or `signed_webhook`
    /// - `TICKETBRIDGE_AUTH_TOKEN`: shared secret
    /// - `TICKETBRIDGE_WEBHOOK_SECRET`: HMAC key
    /// - `TICKETBRIDGE_REPLAY_WINDOW_SECS`: timestamp window (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match std::env::var("TICKETBRIDGE_AUTH_MODE") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => AuthMode::default(),
        };

        let secret = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(SecretString::from)
        };

        Ok(Self {
            mode,
            token: secret("TICKETBRIDGE_AUTH_TOKEN"),
            webhook_secret: secret("TICKETBRIDGE_WEBHOOK_SECRET"),
            replay_window: Duration::from_secs(env_or(
                "TICKETBRIDGE_REPLAY_WINDOW_SECS",
                DEFAULT_REPLAY_WINDOW_SECS,
            )),
        })
    }

    /// Fail if the active mode has no secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            AuthMode::SharedSecret if self.token.is_none() => Err(ConfigError::MissingRequired {
                field: "TICKETBRIDGE_AUTH_TOKEN".to_string(),
            }),
            AuthMode::SignedWebhook if self.webhook_secret.is_none() => {
                Err(ConfigError::MissingRequired {
                    field: "TICKETBRIDGE_WEBHOOK_SECRET".to_string(),
                })
            }
            _ if self.replay_window.is_zero() => Err(ConfigError::InvalidValue {
                field: "TICKETBRIDGE_REPLAY_WINDOW_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn window_secs(&self) -> i64 {
        i64::try_from(self.replay_window.as_secs()).unwrap_or(i64::MAX)
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Raw credential headers of one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub token: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub timestamp: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    /// Read the credential headers. Non-UTF-8 values are treated as empty so
    /// they fail as malformed rather than missing.
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        let read = |name: &str| headers.get(name).map(|v| v.to_str().unwrap_or(""));
        Self {
            token: read(AUTH_TOKEN_HEADER),
            signature: read(SIGNATURE_HEADER),
            timestamp: read(TIMESTAMP_HEADER),
        }
    }
}

/// Outcome of a successful authentication, attached to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub mode: AuthMode,
}

// ============================================================================
// AUTHENTICATOR
// ============================================================================

/// Validates request credentials under the configured mode.
pub struct Authenticator {
    config: AuthConfig,
    replay_guard: Arc<ReplayGuard>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("replay_guard", &self.replay_guard)
            .finish()
    }
}

impl Authenticator {
    pub fn new(config: AuthConfig, replay_guard: Arc<ReplayGuard>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            replay_guard,
            clock,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.config.mode
    }

    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        &self.replay_guard
    }

    /// Authenticate one request. `body` is the raw request body.
    pub fn authenticate(&self, credentials: &Credentials<'_>, body: &[u8]) -> Result<AuthContext, AuthError> {
        match self.config.mode {
            AuthMode::SharedSecret => self.check_token(credentials)?,
            AuthMode::SignedWebhook => self.check_signature(credentials, body)?,
        }
        Ok(AuthContext {
            mode: self.config.mode,
        })
    }

    fn check_token(&self, credentials: &Credentials<'_>) -> Result<(), AuthError> {
        let expected = self.config.token.as_ref().ok_or_else(|| AuthError::NotConfigured {
            field: "TICKETBRIDGE_AUTH_TOKEN".to_string(),
        })?;

        let presented = credentials.token.ok_or(AuthError::MissingCredentials)?;
        if presented.trim().is_empty() {
            return Err(AuthError::MalformedToken {
                reason: "token is empty".to_string(),
            });
        }

        if tokens_match(expected.expose_secret().as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::TokenMismatch)
        }
    }

    fn check_signature(&self, credentials: &Credentials<'_>, body: &[u8]) -> Result<(), AuthError> {
        let secret = self
            .config
            .webhook_secret
            .as_ref()
            .ok_or_else(|| AuthError::NotConfigured {
                field: "TICKETBRIDGE_WEBHOOK_SECRET".to_string(),
            })?;

        let (signature, timestamp) = match (credentials.signature, credentials.timestamp) {
            (None, None) => return Err(AuthError::MissingCredentials),
            (Some(_), None) => {
                return Err(malformed(format!("{} header is missing", TIMESTAMP_HEADER)))
            }
            (None, Some(_)) => {
                return Err(malformed(format!("{} header is missing", SIGNATURE_HEADER)))
            }
            (Some(signature), Some(timestamp)) => (signature, timestamp.trim()),
        };

        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| malformed("timestamp must be integer Unix seconds".to_string()))?;

        let signature = normalize_signature(signature);
        let signature_bytes = hex::decode(&signature)
            .map_err(|_| malformed("signature must be hex encoded".to_string()))?;

        let skew_secs = self.clock.now_epoch_secs().saturating_sub(sent_at);
        let window_secs = self.config.window_secs();
        if skew_secs.saturating_abs() > window_secs {
            return Err(AuthError::StaleTimestamp {
                skew_secs,
                window_secs,
            });
        }

        if self.replay_guard.is_replay(&signature) {
            return Err(AuthError::Replayed);
        }

        let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::NotConfigured {
                field: "TICKETBRIDGE_WEBHOOK_SECRET".to_string(),
            })?;
        mac.update(timestamp.as_bytes());
        mac.update(body);
        mac.verify_slice(&signature_bytes)
            .map_err(|_| AuthError::SignatureMismatch)?;

        // A concurrent request may have recorded the same signature first.
        if !self.replay_guard.record(&signature) {
            return Err(AuthError::Replayed);
        }

        Ok(())
    }
}

fn malformed(reason: String) -> AuthError {
    AuthError::MalformedSignature { reason }
}

/// Strip the optional `sha256=` prefix and lowercase, so equivalent spellings
/// share one replay-guard entry.
fn normalize_signature(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = trimmed
        .get(..SIGNATURE_PREFIX.len())
        .filter(|head| head.eq_ignore_ascii_case(SIGNATURE_PREFIX))
        .map_or(trimmed, |_| &trimmed[SIGNATURE_PREFIX.len()..]);
    without_prefix.to_ascii_lowercase()
}

/// Constant-time token comparison: both tokens key a MAC over the same label
/// and the tags are compared with `verify_slice`.
fn tokens_match(expected: &[u8], presented: &[u8]) -> bool {
    let tag = |key: &[u8]| {
        HmacSha256::new_from_slice(key).map(|mut mac| {
            mac.update(TOKEN_COMPARE_LABEL);
            mac
        })
    };

    match (tag(expected), tag(presented)) {
        (Ok(expected_mac), Ok(presented_mac)) => {
            let expected_tag = expected_mac.finalize().into_bytes();
            presented_mac.verify_slice(&expected_tag).is_ok()
        }
        _ => false,
    }
}

/// Hex HMAC-SHA256 over `timestamp || body`, as a webhook sender computes it.
pub fn sign_webhook(secret: &str, timestamp: &str, body: &[u8]) -> Result<String, ConfigError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
        ConfigError::InvalidValue {
            field: "TICKETBRIDGE_WEBHOOK_SECRET".to_string(),
            value: "[REDACTED]".to_string(),
            reason: e.to_string(),
        }
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
