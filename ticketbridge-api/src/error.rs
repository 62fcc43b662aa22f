//! Error Types for the TicketBridge API
//!
//! Every failure leaving the service has the same JSON shape:
//!
//! ```json
//! {"status": "error", "code": "AUTH_REQUIRED", "message": "...", "details": {...}, "correlationId": "..."}
//! ```
//!
//! Domain errors from `ticketbridge-core` are converted here; handlers and
//! middleware only ever return [`ApiError`].

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use ticketbridge_core::{
    AuthError, ConfigError, HelpdeskError, IdempotencyConflict, TicketBridgeError,
    ValidationError,
};
use uuid::Uuid;

use crate::types::ResponseStatus;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation (400)
    // ========================================================================
    /// Payload failed schema or field validation
    ValidationError,

    // ========================================================================
    // Authentication (401, 403)
    // ========================================================================
    /// No credentials were presented
    AuthRequired,

    /// Shared-secret token is syntactically malformed
    InvalidToken,

    /// Webhook signature or timestamp is syntactically malformed
    InvalidSignature,

    /// Well-formed credentials that did not verify
    AuthFailed,

    // ========================================================================
    // Lookup / conflict (404, 409)
    // ========================================================================
    /// Requested resource does not exist
    NotFound,

    /// Idempotency key reused with a different payload
    IdempotencyConflict,

    // ========================================================================
    // Throttling (429)
    // ========================================================================
    /// Client exceeded its request quota
    RateLimitExceeded,

    // ========================================================================
    // Server (500, 502)
    // ========================================================================
    /// Unexpected internal fault; carries a correlation id
    InternalError,

    /// Helpdesk backend failed or was unreachable
    HelpdeskError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,

            ErrorCode::AuthRequired | ErrorCode::InvalidToken | ErrorCode::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::AuthFailed => StatusCode::FORBIDDEN,

            ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::IdempotencyConflict => StatusCode::CONFLICT,

            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::HelpdeskError => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Request validation failed",
            ErrorCode::AuthRequired => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::InvalidSignature => "Invalid webhook signature",
            ErrorCode::AuthFailed => "Authentication failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::IdempotencyConflict => {
                "Idempotency key was already used with a different payload"
            }
            ErrorCode::RateLimitExceeded => "Rate limit exceeded",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::HelpdeskError => "Helpdesk request failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Always `"error"`
    pub status: ResponseStatus,

    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (offending field, upstream status, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,

    /// Present on internal errors; matches the id in the server log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            code,
            message: message.into(),
            details: None,
            correlation_id: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a ValidationError error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a RateLimitExceeded error.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::from_code(ErrorCode::RateLimitExceeded)
            .with_details(serde_json::json!({ "retryAfterSecs": retry_after_secs }))
    }

    /// Create an InternalError.
    ///
    /// `detail` is logged together with a fresh correlation id; only the id
    /// reaches the client.
    pub fn internal(detail: impl fmt::Display) -> Self {
        let correlation_id = Uuid::now_v7().to_string();
        tracing::error!(correlation_id = %correlation_id, error = %detail, "Internal error");
        Self {
            correlation_id: Some(correlation_id),
            ..Self::from_code(ErrorCode::InternalError)
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        ApiError::validation(err.to_string()).with_details(serde_json::json!({ "field": field }))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::MissingCredentials => ErrorCode::AuthRequired,
            AuthError::MalformedToken { .. } => ErrorCode::InvalidToken,
            AuthError::MalformedSignature { .. } => ErrorCode::InvalidSignature,
            AuthError::TokenMismatch
            | AuthError::SignatureMismatch
            | AuthError::StaleTimestamp { .. }
            | AuthError::Replayed => ErrorCode::AuthFailed,
            // Never let traffic through on a misconfigured deployment.
            AuthError::NotConfigured { .. } => return ApiError::internal(err),
        };

        let message = match code {
            ErrorCode::AuthRequired | ErrorCode::AuthFailed => code.default_message().to_string(),
            _ => err.to_string(),
        };

        ApiError::new(code, message)
            .with_details(serde_json::json!({ "reason": err.reason_label() }))
    }
}

impl From<HelpdeskError> for ApiError {
    fn from(err: HelpdeskError) -> Self {
        tracing::warn!(error = %err, "Helpdesk call failed");

        if let HelpdeskError::TicketNotFound { ticket_id } = &err {
            return ApiError::not_found(err.to_string())
                .with_details(serde_json::json!({ "ticketId": ticket_id }));
        }

        let code = if err.is_client_error() {
            ErrorCode::ValidationError
        } else {
            ErrorCode::HelpdeskError
        };

        let error = ApiError::new(code, err.to_string());
        match err.upstream_status() {
            Some(status) => error.with_details(serde_json::json!({ "upstreamStatus": status })),
            None => error,
        }
    }
}

impl From<IdempotencyConflict> for ApiError {
    fn from(err: IdempotencyConflict) -> Self {
        ApiError::from_code(ErrorCode::IdempotencyConflict)
            .with_details(serde_json::json!({ "idempotencyKey": err.key }))
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal(err)
    }
}

impl From<TicketBridgeError> for ApiError {
    fn from(err: TicketBridgeError) -> Self {
        match err {
            TicketBridgeError::Validation(e) => e.into(),
            TicketBridgeError::Auth(e) => e.into(),
            TicketBridgeError::Config(e) => e.into(),
            TicketBridgeError::Helpdesk(e) => e.into(),
            TicketBridgeError::IdempotencyConflict(e) => e.into(),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::validation(format!("Invalid JSON: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AuthRequired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidSignature.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AuthFailed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::IdempotencyConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RateLimitExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::HelpdeskError.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_body_shape() -> Result<(), serde_json::Error> {
        let err = ApiError::validation("bad note")
            .with_details(serde_json::json!({ "field": "note" }));
        let json = serde_json::to_value(&err)?;

        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "bad note");
        assert_eq!(json["details"]["field"], "note");
        assert!(json.get("correlationId").is_none());
        Ok(())
    }

    #[test]
    fn test_internal_error_carries_correlation_id() {
        let err = ApiError::internal("boom");
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, "Internal server error");
        assert!(err.correlation_id.is_some());
    }

    #[test]
    fn test_auth_error_mapping() {
        let cases = [
            (AuthError::MissingCredentials, ErrorCode::AuthRequired),
            (
                AuthError::MalformedToken {
                    reason: "empty".to_string(),
                },
                ErrorCode::InvalidToken,
            ),
            (
                AuthError::MalformedSignature {
                    reason: "not hex".to_string(),
                },
                ErrorCode::InvalidSignature,
            ),
            (AuthError::TokenMismatch, ErrorCode::AuthFailed),
            (AuthError::SignatureMismatch, ErrorCode::AuthFailed),
            (AuthError::Replayed, ErrorCode::AuthFailed),
            (
                AuthError::StaleTimestamp {
                    skew_secs: 900,
                    window_secs: 300,
                },
                ErrorCode::AuthFailed,
            ),
            (
                AuthError::NotConfigured {
                    field: "TICKETBRIDGE_AUTH_TOKEN".to_string(),
                },
                ErrorCode::InternalError,
            ),
        ];

        for (auth, expected) in cases {
            assert_eq!(ApiError::from(auth).code, expected);
        }
    }

    #[test]
    fn test_helpdesk_error_mapping() {
        let rejected = ApiError::from(HelpdeskError::Upstream {
            status: 422,
            message: "subject required".to_string(),
        });
        assert_eq!(rejected.code, ErrorCode::ValidationError);
        assert_eq!(rejected.details, Some(serde_json::json!({ "upstreamStatus": 422 })));

        let down = ApiError::from(HelpdeskError::Upstream {
            status: 503,
            message: "maintenance".to_string(),
        });
        assert_eq!(down.code, ErrorCode::HelpdeskError);

        let transport = ApiError::from(HelpdeskError::Transport {
            message: "connection refused".to_string(),
        });
        assert_eq!(transport.code, ErrorCode::HelpdeskError);
        assert!(transport.details.is_none());

        let missing = ApiError::from(HelpdeskError::TicketNotFound {
            ticket_id: "TKT-9".to_string(),
        });
        assert_eq!(missing.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ApiError::from(ValidationError::InvalidValue {
            field: "callerNumber".to_string(),
            reason: "must be E.164".to_string(),
        });
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.details, Some(serde_json::json!({ "field": "callerNumber" })));
    }
}
