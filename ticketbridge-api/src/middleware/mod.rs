//! Middleware modules for the TicketBridge API
//!
//! - `rate_limit`: per-client-IP request budget
//! - `auth`: shared-secret or signed-webhook authentication
//! - `idempotency`: `Idempotency-Key` replay for the ingest route
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/escalations", post(ingest).layer(idempotency))
//!     // Auth must run before idempotency so unauthenticated bodies are never cached
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     // Rate limiting runs before auth
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     // Outermost: observability
//!     .layer(middleware::from_fn(observability_middleware))
//! ```

mod auth;
pub mod idempotency;
mod rate_limit;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
pub use idempotency::{idempotency_middleware, IdempotencyError, IdempotencyState};
pub use rate_limit::{rate_limit_middleware, RateLimitError, RateLimitState};
