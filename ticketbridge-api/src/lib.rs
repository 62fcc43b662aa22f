//! TicketBridge API - Escalation Ingest Service
//!
//! Accepts escalation notes from voice agents and assistants, deduplicates
//! them against recently opened tickets and files them with the helpdesk.
//! Exposes an ingest endpoint, a tool-calling surface, health probes and
//! Prometheus metrics over Axum.

#[macro_use]
mod macros;

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod helpdesk;
pub mod jobs;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{sign_webhook, AuthConfig, AuthContext, AuthMode, Authenticator, Credentials};
pub use config::{ApiConfig, CacheConfig, HelpdeskConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use helpdesk::{HttpHelpdesk, InMemoryHelpdesk};
pub use jobs::{spawn_sweepers, SweepMetrics};
pub use middleware::AuthExtractor;
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::build_router;
pub use services::TicketService;
pub use state::AppState;
pub use types::*;
