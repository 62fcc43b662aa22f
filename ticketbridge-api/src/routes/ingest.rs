//! Escalation Ingest Endpoint
//!
//! `POST /api/v1/escalations` turns a four-line escalation note into a
//! helpdesk ticket, reusing a live ticket for the same correlation key or
//! caller+category. Each field resolves from the explicit payload value
//! first, then the parsed note, then keyword inference over the note text.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use ticketbridge_core::{
    infer_category, infer_escalation_reason, validate_caller_number, validate_oa_key, Confidence,
    EscalationRequest, Note,
};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::services::TicketService;
use crate::types::{Echo, IngestRequest, IngestResponse, ResponseStatus};

/// A validated ingest payload, ready for the ticket service.
#[derive(Debug, Clone)]
pub(crate) struct PreparedEscalation {
    pub request: EscalationRequest,
    pub note: Note,
    pub echo: Echo,
}

/// Validate the payload and resolve category, reason and confidence.
pub(crate) fn prepare(payload: IngestRequest) -> ApiResult<PreparedEscalation> {
    let note = Note::sanitize(&payload.note, false)?;

    if let Some(caller) = payload.caller_number.as_deref() {
        validate_caller_number(caller)?;
    }
    if let Some(key) = payload.oa_key.as_deref() {
        validate_oa_key(key)?;
    }

    // Notes without the standard prefixes fall through to inference.
    let parsed = note.fields().ok();

    let category = payload
        .category
        .or(parsed.as_ref().map(|f| f.category))
        .unwrap_or_else(|| infer_category(note.as_str()));
    let reason = payload
        .escalation_reason
        .or(parsed.as_ref().map(|f| f.reason))
        .unwrap_or_else(|| infer_escalation_reason(note.as_str()));
    let confidence = payload
        .confidence
        .or(parsed.as_ref().map(|f| f.confidence))
        .unwrap_or(Confidence::ZERO);

    let echo = Echo {
        oa_key: payload.oa_key.clone(),
        caller_number: payload.caller_number.clone(),
    };

    Ok(PreparedEscalation {
        request: EscalationRequest {
            description: note.as_str().to_string(),
            category: Some(category),
            reason: Some(reason),
            caller_number: payload.caller_number,
            correlation_key: payload.oa_key,
            confidence,
            source: payload.source.unwrap_or_default(),
            metadata: payload.metadata.unwrap_or_default(),
        },
        note,
        echo,
    })
}

/// Run a prepared escalation through find-or-create.
pub(crate) async fn escalate(
    tickets: &TicketService,
    prepared: PreparedEscalation,
) -> ApiResult<IngestResponse> {
    let confidence = prepared.request.confidence;
    let outcome = tickets.find_or_create(prepared.request).await?;

    tracing::info!(
        ticket_id = %outcome.ticket.ticket_id,
        created = outcome.created,
        category = %outcome.category,
        oa_key = ?prepared.echo.oa_key,
        "Escalation resolved"
    );

    Ok(IngestResponse {
        status: ResponseStatus::Ok,
        created: outcome.created,
        ticket_id: outcome.ticket.ticket_id,
        ticket_url: outcome.ticket.ticket_url,
        category: outcome.category,
        escalation_reason: outcome.reason,
        confidence,
        echo: prepared.echo,
    })
}

/// POST /api/v1/escalations - Ingest an escalation note
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/escalations",
    tag = "Escalations",
    request_body = IngestRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Replays the first response for retries (1-256 chars)"),
    ),
    responses(
        (status = 200, description = "Ticket created or reused", body = IngestResponse),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or malformed credentials", body = ApiError),
        (status = 403, description = "Credentials rejected", body = ApiError),
        (status = 409, description = "Idempotency key reused with a different payload", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
        (status = 502, description = "Helpdesk failure", body = ApiError),
    ),
    security(("auth_token" = []), ("webhook_signature" = [])),
))]
pub async fn ingest_escalation(
    State(tickets): State<Arc<TicketService>>,
    AuthExtractor(auth): AuthExtractor,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(payload) = payload?;
    tracing::debug!(auth_mode = %auth.mode, "Escalation received");

    let prepared = prepare(payload)?;
    let response = escalate(&tickets, prepared).await?;
    Ok(Json(response))
}
