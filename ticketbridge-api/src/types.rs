//! Request and response types for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use ticketbridge_core::{Category, Confidence, EscalationReason, Source};

/// Top-level `status` marker on every JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

// ============================================================================
// INGEST
// ============================================================================

/// Body of `POST /api/v1/escalations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Four-line escalation note, at most 350 characters
    pub note: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub escalation_reason: Option<EscalationReason>,
    /// Decimal string between "0.0" and "1.0"
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub confidence: Option<Confidence>,
    /// E.164 phone number of the caller
    #[serde(default)]
    pub caller_number: Option<String>,
    /// Correlation key from the voice agent (6-64 chars, `[A-Za-z0-9_-]`)
    #[serde(default)]
    pub oa_key: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    /// Free-form key/value pairs forwarded to the helpdesk
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<Map<String, JsonValue>>,
}

/// Identifiers echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Echo {
    pub oa_key: Option<String>,
    pub caller_number: Option<String>,
}

/// Successful ingest response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub status: ResponseStatus,
    /// False when an existing ticket was reused
    pub created: bool,
    pub ticket_id: String,
    pub ticket_url: String,
    pub category: Category,
    pub escalation_reason: EscalationReason,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub confidence: Confidence,
    pub echo: Echo,
}

// ============================================================================
// TOOLS
// ============================================================================

/// A callable tool and the JSON Schema of its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub input_schema: JsonValue,
}

/// Response of `GET /api/v1/tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Body of `POST /api/v1/tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CallToolRequest {
    pub name: String,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub arguments: JsonValue,
}

/// Successful tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CallToolResponse {
    pub status: ResponseStatus,
    pub tool: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub result: JsonValue,
}
