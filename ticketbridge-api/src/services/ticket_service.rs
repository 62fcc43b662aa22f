//! Ticket Service
//!
//! Find-or-create orchestration over the ticket index and the helpdesk.
//! Per escalation the first matching branch wins:
//!
//! 1. correlation key with a live index entry: reuse it
//! 2. caller number with a live caller+category entry: reuse it
//! 3. otherwise create a ticket and index it under every key supplied
//!
//! The index is never locked across the helpdesk call, so two concurrent
//! requests with the same new key may both create a ticket.

use crate::telemetry::with_metrics;
use serde_json::Value;
use std::sync::Arc;
use ticketbridge_core::{
    infer_category, infer_escalation_reason, AppendNoteOutcome, Category, Clock, DedupKeys,
    EscalationReason, EscalationRequest, HelpdeskCapability, NewTicket, Note, NoteAuthor,
    TicketBridgeResult, TicketOutcome, TicketRef, ValidateNonEmpty,
};
use ticketbridge_storage::TicketIndex;

/// Orchestrates ticket lookup, creation and note appending.
#[derive(Clone)]
pub struct TicketService {
    helpdesk: Arc<dyn HelpdeskCapability>,
    index: Arc<TicketIndex>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TicketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketService")
            .field("helpdesk", &self.helpdesk.name())
            .field("index", &self.index)
            .finish()
    }
}

impl TicketService {
    pub fn new(
        helpdesk: Arc<dyn HelpdeskCapability>,
        index: Arc<TicketIndex>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            helpdesk,
            index,
            clock,
        }
    }

    pub fn helpdesk(&self) -> &Arc<dyn HelpdeskCapability> {
        &self.helpdesk
    }

    /// Return the live ticket for this escalation, creating one if none exists.
    pub async fn find_or_create(&self, request: EscalationRequest) -> TicketBridgeResult<TicketOutcome> {
        request.description.validate_non_empty("description")?;
        let (category, reason) = resolve(&request);

        if let Some(key) = request.correlation_key.as_deref() {
            if let Some(ticket) = self.index.find_by_correlation_key(key) {
                tracing::info!(
                    ticket_id = %ticket.ticket_id,
                    oa_key = %key,
                    "Reusing ticket by correlation key"
                );
                with_metrics(|m| m.record_ticket_deduplicated("correlation_key"));
                return Ok(TicketOutcome {
                    ticket,
                    created: false,
                    category,
                    reason,
                });
            }
        }

        if let Some(caller) = request.caller_number.as_deref() {
            if let Some(ticket) = self.index.find_by_caller_category(caller, category) {
                tracing::info!(
                    ticket_id = %ticket.ticket_id,
                    category = %category,
                    "Reusing ticket by caller and category"
                );
                with_metrics(|m| m.record_ticket_deduplicated("caller"));
                return Ok(TicketOutcome {
                    ticket,
                    created: false,
                    category,
                    reason,
                });
            }
        }

        let ticket = self.create(&request, category, reason).await?;
        self.index.store(
            &ticket,
            request.correlation_key.as_deref(),
            request.caller_number.as_deref(),
            Some(category),
        );
        with_metrics(|m| m.record_ticket_created("find_or_create"));

        Ok(TicketOutcome {
            ticket,
            created: true,
            category,
            reason,
        })
    }

    /// Create a ticket without consulting or updating the index.
    pub async fn create_direct(&self, request: EscalationRequest) -> TicketBridgeResult<TicketOutcome> {
        request.description.validate_non_empty("description")?;
        let (category, reason) = resolve(&request);

        let ticket = self.create(&request, category, reason).await?;
        with_metrics(|m| m.record_ticket_created("direct"));

        Ok(TicketOutcome {
            ticket,
            created: true,
            category,
            reason,
        })
    }

    /// Append a note to an existing ticket.
    pub async fn append_note(
        &self,
        ticket_id: &str,
        note: &Note,
        author: Option<NoteAuthor>,
    ) -> TicketBridgeResult<AppendNoteOutcome> {
        ticket_id.validate_non_empty("ticketId")?;
        let outcome = self
            .helpdesk
            .append_note(ticket_id, note.as_str(), author)
            .await?;
        tracing::info!(ticket_id = %ticket_id, success = outcome.success, "Note appended");
        Ok(outcome)
    }

    async fn create(
        &self,
        request: &EscalationRequest,
        category: Category,
        reason: EscalationReason,
    ) -> TicketBridgeResult<TicketRef> {
        let mut metadata = request.metadata.clone();
        metadata
            .entry("confidence")
            .or_insert_with(|| Value::String(request.confidence.to_string()));
        if let Some(key) = &request.correlation_key {
            metadata
                .entry("oaKey")
                .or_insert_with(|| Value::String(key.clone()));
        }

        let new_ticket = NewTicket {
            subject: NewTicket::subject_for(category, reason, request.caller_number.as_deref()),
            description: request.description.clone(),
            category,
            escalation_reason: reason,
            caller_number: request.caller_number.clone(),
            source: request.source,
            metadata,
        };

        let created = self.helpdesk.create_ticket(new_ticket).await.map_err(|err| {
            tracing::warn!(
                error = %err,
                helpdesk = self.helpdesk.name(),
                upstream_status = ?err.upstream_status(),
                "Helpdesk rejected ticket creation"
            );
            err
        })?;

        tracing::info!(
            ticket_id = %created.ticket_id,
            category = %category,
            reason = %reason,
            helpdesk = self.helpdesk.name(),
            "Ticket created"
        );

        Ok(TicketRef {
            ticket_id: created.ticket_id,
            ticket_url: created.ticket_url,
            created_at: self.clock.now(),
            dedup_keys: DedupKeys {
                correlation_key: request.correlation_key.clone(),
                caller_number: request.caller_number.clone(),
                category: Some(category),
            },
        })
    }
}

/// Explicit category and reason win over inference from the description.
fn resolve(request: &EscalationRequest) -> (Category, EscalationReason) {
    (
        request
            .category
            .unwrap_or_else(|| infer_category(&request.description)),
        request
            .reason
            .unwrap_or_else(|| infer_escalation_reason(&request.description)),
    )
}
