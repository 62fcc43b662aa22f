//! Tool Entry Points
//!
//! A small tool-calling surface for assistants that speak in named tools
//! rather than REST resources. `GET /api/v1/tools` lists each tool with the
//! JSON Schema of its arguments; `POST /api/v1/tools/call` validates the
//! arguments against that schema, then against the same field rules as the
//! ingest endpoint, and dispatches.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value as JsonValue};
use std::str::FromStr;
use std::sync::Arc;
use ticketbridge_core::{
    validate_caller_number, validate_oa_key, Category, Confidence, EscalationReason,
    EscalationRequest, Note, NoteAuthor, Source, TicketOutcome, MAX_NOTE_CHARS,
};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::middleware::AuthExtractor;
use crate::routes::ingest::{escalate, prepare};
use crate::services::TicketService;
use crate::telemetry::with_metrics;
use crate::types::{
    CallToolRequest, CallToolResponse, IngestRequest, ListToolsResponse, ResponseStatus,
    ToolDefinition,
};

// ============================================================================
// TOOL DEFINITIONS
// ============================================================================

/// Every callable tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    CreateTicketDirect,
    AppendNote,
    FindOrCreateTicket,
    RenderNote,
    Handoff,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::CreateTicketDirect,
        Tool::AppendNote,
        Tool::FindOrCreateTicket,
        Tool::RenderNote,
        Tool::Handoff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::CreateTicketDirect => "create_ticket_direct",
            Tool::AppendNote => "append_note",
            Tool::FindOrCreateTicket => "find_or_create_ticket",
            Tool::RenderNote => "render_note",
            Tool::Handoff => "handoff",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::CreateTicketDirect => {
                "Create a helpdesk ticket without deduplication"
            }
            Tool::AppendNote => "Append a note to an existing ticket",
            Tool::FindOrCreateTicket => {
                "Return the live ticket for this correlation key or caller+category, creating one if none exists"
            }
            Tool::RenderNote => "Render the four-line escalation note without creating a ticket",
            Tool::Handoff => {
                "Ingest an escalation note; when an existing ticket is reused the note is appended to it"
            }
        }
    }

    pub fn input_schema(&self) -> JsonValue {
        match self {
            Tool::CreateTicketDirect | Tool::FindOrCreateTicket => json!({
                "type": "object",
                "properties": ticket_properties(),
                "required": ["description"],
                "additionalProperties": false
            }),
            Tool::AppendNote => json!({
                "type": "object",
                "properties": {
                    "ticketId": { "type": "string", "minLength": 1 },
                    "note": { "type": "string", "minLength": 1 },
                    "authorName": { "type": "string", "minLength": 1 },
                    "authorEmail": { "type": "string", "minLength": 3 },
                    "truncate": {
                        "type": "boolean",
                        "description": "Clip an over-length note instead of rejecting it (default true)"
                    }
                },
                "required": ["ticketId", "note"],
                "additionalProperties": false
            }),
            Tool::RenderNote => json!({
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "minLength": 1 },
                    "category": category_schema(),
                    "escalationReason": reason_schema(),
                    "confidence": confidence_schema()
                },
                "required": ["summary"],
                "additionalProperties": false
            }),
            Tool::Handoff => json!({
                "type": "object",
                "properties": {
                    "note": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_NOTE_CHARS,
                        "description": "Four-line escalation note"
                    },
                    "category": category_schema(),
                    "escalationReason": reason_schema(),
                    "callerNumber": caller_schema(),
                    "oaKey": oa_key_schema(),
                    "confidence": confidence_schema(),
                    "source": source_schema(),
                    "metadata": { "type": "object" }
                },
                "required": ["note"],
                "additionalProperties": false
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

impl FromStr for Tool {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| {
                ApiError::not_found(format!("Unknown tool: {}", s))
                    .with_details(json!({ "tool": s }))
            })
    }
}

fn ticket_properties() -> JsonValue {
    json!({
        "description": {
            "type": "string",
            "minLength": 1,
            "description": "Free-text description of the problem"
        },
        "category": category_schema(),
        "escalationReason": reason_schema(),
        "callerNumber": caller_schema(),
        "oaKey": oa_key_schema(),
        "confidence": confidence_schema(),
        "source": source_schema(),
        "metadata": { "type": "object" }
    })
}

fn category_schema() -> JsonValue {
    let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    json!({ "type": "string", "enum": names })
}

fn reason_schema() -> JsonValue {
    let names: Vec<&str> = EscalationReason::ALL.iter().map(|r| r.as_str()).collect();
    json!({ "type": "string", "enum": names })
}

fn source_schema() -> JsonValue {
    json!({ "type": "string", "enum": ["VoiceAgent", "DesktopAssistant", "Other"] })
}

fn caller_schema() -> JsonValue {
    json!({ "type": "string", "pattern": "^\\+[1-9][0-9]{1,14}$", "description": "E.164 phone number" })
}

fn oa_key_schema() -> JsonValue {
    json!({ "type": "string", "pattern": "^[A-Za-z0-9_-]{6,64}$" })
}

fn confidence_schema() -> JsonValue {
    json!({
        "type": ["string", "number"],
        "description": "Decimal between 0.0 and 1.0"
    })
}

/// Validate tool input against a JSON Schema.
fn validate_tool_input(input: &JsonValue, schema: &JsonValue) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft202012::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(input).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketArgs {
    description: String,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    escalation_reason: Option<EscalationReason>,
    #[serde(default)]
    caller_number: Option<String>,
    #[serde(default)]
    oa_key: Option<String>,
    #[serde(default)]
    confidence: Option<Confidence>,
    #[serde(default)]
    source: Option<Source>,
    #[serde(default)]
    metadata: Option<Map<String, JsonValue>>,
}

impl TicketArgs {
    fn into_request(self) -> ApiResult<EscalationRequest> {
        if let Some(caller) = self.caller_number.as_deref() {
            validate_caller_number(caller)?;
        }
        if let Some(key) = self.oa_key.as_deref() {
            validate_oa_key(key)?;
        }
        Ok(EscalationRequest {
            description: self.description,
            category: self.category,
            reason: self.escalation_reason,
            caller_number: self.caller_number,
            correlation_key: self.oa_key,
            confidence: self.confidence.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendNoteArgs {
    ticket_id: String,
    note: String,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    author_email: Option<String>,
    #[serde(default = "default_truncate")]
    truncate: bool,
}

fn default_truncate() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderNoteArgs {
    summary: String,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    escalation_reason: Option<EscalationReason>,
    #[serde(default)]
    confidence: Option<Confidence>,
}

fn parse_args<T: DeserializeOwned>(arguments: JsonValue) -> ApiResult<T> {
    serde_json::from_value(arguments)
        .map_err(|e| ApiError::validation(format!("Invalid arguments: {}", e)))
}

fn outcome_json(outcome: TicketOutcome) -> JsonValue {
    json!({
        "ticketId": outcome.ticket.ticket_id,
        "ticketUrl": outcome.ticket.ticket_url,
        "created": outcome.created,
        "category": outcome.category,
        "escalationReason": outcome.reason,
    })
}

// ============================================================================
// DISPATCH
// ============================================================================

async fn dispatch(tickets: &TicketService, tool: Tool, arguments: JsonValue) -> ApiResult<JsonValue> {
    match tool {
        Tool::CreateTicketDirect => {
            let request = parse_args::<TicketArgs>(arguments)?.into_request()?;
            let outcome = tickets.create_direct(request).await?;
            Ok(outcome_json(outcome))
        }
        Tool::FindOrCreateTicket => {
            let request = parse_args::<TicketArgs>(arguments)?.into_request()?;
            let outcome = tickets.find_or_create(request).await?;
            Ok(outcome_json(outcome))
        }
        Tool::AppendNote => {
            let args: AppendNoteArgs = parse_args(arguments)?;
            let note = Note::sanitize(&args.note, args.truncate)?;
            let author = args.author_name.map(|name| NoteAuthor {
                name,
                email: args.author_email,
            });
            let outcome = tickets.append_note(&args.ticket_id, &note, author).await?;
            Ok(json!({
                "ticketId": args.ticket_id,
                "success": outcome.success,
                "message": outcome.message,
            }))
        }
        Tool::RenderNote => {
            let args: RenderNoteArgs = parse_args(arguments)?;
            let note = Note::compose(
                &args.summary,
                args.category,
                args.escalation_reason,
                args.confidence.unwrap_or_default(),
            )?;
            Ok(json!({ "note": note }))
        }
        Tool::Handoff => {
            let payload: IngestRequest = parse_args(arguments)?;
            let prepared = prepare(payload)?;
            let note = prepared.note.clone();
            let response = escalate(tickets, prepared).await?;

            let note_appended = if response.created {
                false
            } else {
                match tickets.append_note(&response.ticket_id, &note, None).await {
                    Ok(outcome) => outcome.success,
                    Err(err) => {
                        tracing::warn!(
                            ticket_id = %response.ticket_id,
                            error = %err,
                            "Handoff reused a ticket but appending the note failed"
                        );
                        false
                    }
                }
            };

            let mut result = serde_json::to_value(&response)?;
            if let Some(fields) = result.as_object_mut() {
                fields.remove("status");
                fields.insert("noteAppended".to_string(), JsonValue::Bool(note_appended));
            }
            Ok(result)
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/tools - List callable tools
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/tools",
    tag = "Tools",
    responses(
        (status = 200, description = "Available tools", body = ListToolsResponse),
        (status = 401, description = "Missing or malformed credentials", body = ApiError),
    ),
    security(("auth_token" = []), ("webhook_signature" = [])),
))]
pub async fn list_tools(AuthExtractor(_auth): AuthExtractor) -> Json<ListToolsResponse> {
    Json(ListToolsResponse {
        tools: Tool::ALL.iter().map(Tool::definition).collect(),
    })
}

/// POST /api/v1/tools/call - Invoke a tool
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/tools/call",
    tag = "Tools",
    request_body = CallToolRequest,
    responses(
        (status = 200, description = "Tool result", body = CallToolResponse),
        (status = 400, description = "Arguments failed validation", body = ApiError),
        (status = 404, description = "Unknown tool or ticket", body = ApiError),
        (status = 502, description = "Helpdesk failure", body = ApiError),
    ),
    security(("auth_token" = []), ("webhook_signature" = [])),
))]
pub async fn call_tool(
    State(tickets): State<Arc<TicketService>>,
    AuthExtractor(_auth): AuthExtractor,
    payload: Result<Json<CallToolRequest>, JsonRejection>,
) -> ApiResult<Json<CallToolResponse>> {
    let Json(request) = payload?;
    let tool: Tool = request.name.parse()?;

    let arguments = match request.arguments {
        JsonValue::Null => JsonValue::Object(Map::new()),
        other => other,
    };

    if let Err(errors) = validate_tool_input(&arguments, &tool.input_schema()) {
        with_metrics(|m| m.record_tool_call(tool.as_str(), false));
        return Err(ApiError::new(
            ErrorCode::ValidationError,
            format!("Invalid arguments for tool '{}'", tool.as_str()),
        )
        .with_details(json!({ "errors": errors })));
    }

    let result = dispatch(&tickets, tool, arguments).await;
    with_metrics(|m| m.record_tool_call(tool.as_str(), result.is_ok()));

    match result {
        Ok(result) => {
            tracing::debug!(tool = tool.as_str(), "Tool call succeeded");
            Ok(Json(CallToolResponse {
                status: ResponseStatus::Ok,
                tool: tool.as_str().to_string(),
                result,
            }))
        }
        Err(err) => {
            tracing::info!(tool = tool.as_str(), code = %err.code, "Tool call failed");
            Err(err)
        }
    }
}
