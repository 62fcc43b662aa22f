//! Constants for the TicketBridge API
//!
//! Header names, limits and configuration defaults in one place.

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Shared-secret header
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Signed-webhook HMAC header
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Signed-webhook Unix timestamp header
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Optional prefix tolerated on webhook signatures
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Default accepted clock skew and replay window in seconds (5 minutes)
pub const DEFAULT_REPLAY_WINDOW_SECS: u64 = 300;

// ============================================================================
// IDEMPOTENCY
// ============================================================================

/// Header carrying the client's idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Set on responses served from the idempotency cache
pub const IDEMPOTENCY_REPLAY_HEADER: &str = "x-idempotency-replay";

/// Longest accepted idempotency key, in characters
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 256;

/// Default record lifetime in seconds (15 minutes)
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 900;

/// Default sweep interval in seconds (5 minutes)
pub const DEFAULT_IDEMPOTENCY_SWEEP_SECS: u64 = 300;

/// Default key cap
pub const DEFAULT_IDEMPOTENCY_MAX_KEYS: usize = 10_000;

// ============================================================================
// TICKET INDEX
// ============================================================================

/// Default deduplication window in seconds (4 hours)
pub const DEFAULT_TICKET_TTL_SECS: u64 = 14_400;

/// Default sweep interval in seconds (30 minutes)
pub const DEFAULT_TICKET_SWEEP_SECS: u64 = 1_800;

/// Default replay guard sweep interval in seconds
pub const DEFAULT_REPLAY_SWEEP_SECS: u64 = 60;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Default requests per minute per client IP
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Default burst size for rate limiting
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;

/// Interval at which idle rate limiter keys are dropped, in seconds
pub const DEFAULT_RATE_LIMIT_SWEEP_SECS: u64 = 60;

// ============================================================================
// REQUEST LIMITS
// ============================================================================

/// Default request body cap (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// HELPDESK
// ============================================================================

/// Default helpdesk request timeout in seconds
pub const DEFAULT_HELPDESK_TIMEOUT_SECS: u64 = 10;

/// First id handed out by the in-memory helpdesk
pub const MEMORY_HELPDESK_FIRST_ID: u64 = 1000;

/// Id prefix used by the in-memory helpdesk
pub const MEMORY_HELPDESK_ID_PREFIX: &str = "TKT-";

// ============================================================================
// SERVER
// ============================================================================

/// Default port when neither `TICKETBRIDGE_BIND` nor `PORT` is set
pub const DEFAULT_PORT: u16 = 8080;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_are_ordered() {
        assert!(DEFAULT_IDEMPOTENCY_SWEEP_SECS < DEFAULT_IDEMPOTENCY_TTL_SECS);
        assert!(DEFAULT_TICKET_SWEEP_SECS < DEFAULT_TICKET_TTL_SECS);
        assert!(DEFAULT_REPLAY_SWEEP_SECS < DEFAULT_REPLAY_WINDOW_SECS);
    }

    #[test]
    fn test_header_names_are_lowercase() {
        for header in [
            AUTH_TOKEN_HEADER,
            SIGNATURE_HEADER,
            TIMESTAMP_HEADER,
            IDEMPOTENCY_KEY_HEADER,
            IDEMPOTENCY_REPLAY_HEADER,
        ] {
            assert_eq!(header, header.to_lowercase());
        }
    }
}
