//! Ticket and escalation types

use crate::enums::{Category, EscalationReason, Source};
use crate::validation::Confidence;
use crate::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys under which a ticket reference is indexed for deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupKeys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// A previously created ticket as remembered by the ticket index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRef {
    pub ticket_id: String,
    pub ticket_url: String,
    pub created_at: Timestamp,
    pub dedup_keys: DedupKeys,
}

/// Incoming escalation after payload validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscalationRequest {
    pub description: String,
    pub category: Option<Category>,
    pub reason: Option<EscalationReason>,
    pub caller_number: Option<String>,
    pub correlation_key: Option<String>,
    pub confidence: Confidence,
    pub source: Source,
    pub metadata: Map<String, Value>,
}

/// Ticket creation request sent to a helpdesk backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub category: Category,
    pub escalation_reason: EscalationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_number: Option<String>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl NewTicket {
    /// Subject line shown in the helpdesk queue.
    pub fn subject_for(category: Category, reason: EscalationReason, caller: Option<&str>) -> String {
        match caller {
            Some(caller) => format!("[{}] {} - {}", category, reason, caller),
            None => format!("[{}] {}", category, reason),
        }
    }
}

/// Identifiers returned by a helpdesk after creating a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTicket {
    pub ticket_id: String,
    pub ticket_url: String,
}

/// Result of the orchestrator's find-or-create decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketOutcome {
    pub ticket: TicketRef,
    pub created: bool,
    pub category: Category,
    pub reason: EscalationReason,
}
