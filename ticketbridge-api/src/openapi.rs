//! OpenAPI Specification for the TicketBridge API
//!
//! Generated from route annotations and schema derives with utoipa. Served
//! at `GET /api-docs/openapi.json`.

use axum::Json;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::types::*;
use ticketbridge_core::{Category, EscalationReason, Source};

/// OpenAPI document for the TicketBridge API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TicketBridge API",
        version = "0.1.0",
        description = "Turns voice-agent and assistant escalation notes into helpdesk tickets",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local Development")
    ),
    tags(
        (name = "Escalations", description = "Escalation note ingest"),
        (name = "Tools", description = "Tool-calling surface for assistants"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        crate::routes::ingest::ingest_escalation,
        crate::routes::tools::list_tools,
        crate::routes::tools::call_tool,
        crate::routes::health::ping,
        crate::routes::health::liveness,
        crate::routes::health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        ResponseStatus,
        IngestRequest,
        IngestResponse,
        Echo,
        ToolDefinition,
        ListToolsResponse,
        CallToolRequest,
        CallToolResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
        Category,
        EscalationReason,
        Source,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-auth-token"))),
            );
            // x-timestamp must accompany the signature
            components.add_security_scheme(
                "webhook_signature",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-signature"))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
