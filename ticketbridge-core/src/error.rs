//! Error types for TicketBridge operations

use thiserror::Error;

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Note too long: {chars} characters (max {max})")]
    NoteTooLong { chars: usize, max: usize },

    #[error("Note must have exactly {expected} lines, found {lines}")]
    NoteLineCount { lines: usize, expected: usize },

    #[error("Note line {line} is empty")]
    EmptyNoteLine { line: usize },

    #[error("Note line {line} must start with '{prefix}'")]
    MissingNotePrefix { line: usize, prefix: &'static str },
}

impl ValidationError {
    /// Name of the offending field, when the error is tied to one.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::InvalidValue { field, .. } => field,
            _ => "note",
        }
    }
}

/// Authentication errors.
///
/// Malformed credentials are distinguished from well-formed credentials that
/// fail verification so the API layer can answer 401 or 403 respectively.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,

    #[error("Malformed token: {reason}")]
    MalformedToken { reason: String },

    #[error("Malformed signature: {reason}")]
    MalformedSignature { reason: String },

    #[error("Token does not match")]
    TokenMismatch,

    #[error("Signature does not match")]
    SignatureMismatch,

    #[error("Timestamp outside the {window_secs}s window (skew {skew_secs}s)")]
    StaleTimestamp { skew_secs: i64, window_secs: i64 },

    #[error("Signature already used")]
    Replayed,

    #[error("Authentication is not configured: missing {field}")]
    NotConfigured { field: String },
}

impl AuthError {
    /// Short label used for metrics and logs.
    pub fn reason_label(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing",
            AuthError::MalformedToken { .. } => "malformed_token",
            AuthError::MalformedSignature { .. } => "malformed_signature",
            AuthError::TokenMismatch => "token_mismatch",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::StaleTimestamp { .. } => "stale",
            AuthError::Replayed => "replay",
            AuthError::NotConfigured { .. } => "not_configured",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors reported by a helpdesk backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HelpdeskError {
    #[error("Helpdesk returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Helpdesk request failed: {message}")]
    Transport { message: String },

    #[error("Invalid helpdesk response: {message}")]
    InvalidResponse { message: String },

    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: String },
}

impl HelpdeskError {
    /// HTTP status reported by the upstream, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            HelpdeskError::Upstream { status, .. } => Some(*status),
            HelpdeskError::TicketNotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// True when the upstream rejected the request itself (4xx).
    pub fn is_client_error(&self) -> bool {
        self.upstream_status()
            .is_some_and(|status| (400..500).contains(&status))
    }
}

/// An idempotency key was reused with a different payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Idempotency key '{key}' was already used with a different payload")]
pub struct IdempotencyConflict {
    pub key: String,
}

/// Master error type for all TicketBridge errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TicketBridgeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Helpdesk error: {0}")]
    Helpdesk(#[from] HelpdeskError),

    #[error("{0}")]
    IdempotencyConflict(#[from] IdempotencyConflict),
}

/// Result type alias for TicketBridge operations.
pub type TicketBridgeResult<T> = Result<T, TicketBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_line_count() {
        let err = ValidationError::NoteLineCount {
            lines: 3,
            expected: 4,
        };
        assert_eq!(err.to_string(), "Note must have exactly 4 lines, found 3");
        assert_eq!(err.field(), "note");
    }

    #[test]
    fn test_validation_error_field_name() {
        let err = ValidationError::InvalidValue {
            field: "callerNumber".to_string(),
            reason: "not E.164".to_string(),
        };
        assert_eq!(err.field(), "callerNumber");
    }

    #[test]
    fn test_helpdesk_error_client_classification() {
        let rejected = HelpdeskError::Upstream {
            status: 422,
            message: "bad".to_string(),
        };
        assert!(rejected.is_client_error());

        let down = HelpdeskError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(!down.is_client_error());

        let transport = HelpdeskError::Transport {
            message: "connection reset".to_string(),
        };
        assert_eq!(transport.upstream_status(), None);
        assert!(!transport.is_client_error());
    }

    #[test]
    fn test_master_error_from_conversions() {
        let validation = TicketBridgeError::from(ValidationError::RequiredFieldMissing {
            field: "note".to_string(),
        });
        assert!(matches!(validation, TicketBridgeError::Validation(_)));

        let auth = TicketBridgeError::from(AuthError::Replayed);
        assert!(matches!(auth, TicketBridgeError::Auth(_)));

        let config = TicketBridgeError::from(ConfigError::MissingRequired {
            field: "TICKETBRIDGE_AUTH_TOKEN".to_string(),
        });
        assert!(matches!(config, TicketBridgeError::Config(_)));

        let conflict = TicketBridgeError::from(IdempotencyConflict {
            key: "k1".to_string(),
        });
        assert!(matches!(conflict, TicketBridgeError::IdempotencyConflict(_)));
    }

    #[test]
    fn test_auth_reason_labels_are_distinct() {
        let errors = [
            AuthError::MissingCredentials,
            AuthError::MalformedToken { reason: String::new() },
            AuthError::MalformedSignature { reason: String::new() },
            AuthError::TokenMismatch,
            AuthError::SignatureMismatch,
            AuthError::StaleTimestamp { skew_secs: 0, window_secs: 0 },
            AuthError::Replayed,
            AuthError::NotConfigured { field: String::new() },
        ];
        let mut labels: Vec<_> = errors.iter().map(AuthError::reason_label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), errors.len());
    }
}
