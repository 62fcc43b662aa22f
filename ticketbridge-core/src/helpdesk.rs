//! Helpdesk capability contract
//!
//! The orchestrator talks to the ticketing system only through this trait.
//! Concrete backends live in the API crate.

use crate::error::HelpdeskError;
use crate::ticket::{CreatedTicket, NewTicket};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who wrote an appended note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Outcome of appending a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendNoteOutcome {
    pub success: bool,
    pub message: String,
}

/// Ticket creation and note appending against an external helpdesk.
#[async_trait]
pub trait HelpdeskCapability: Send + Sync {
    /// Short backend name for logs and metrics.
    fn name(&self) -> &'static str;

    async fn create_ticket(&self, ticket: NewTicket) -> Result<CreatedTicket, HelpdeskError>;

    async fn append_note(
        &self,
        ticket_id: &str,
        note: &str,
        author: Option<NoteAuthor>,
    ) -> Result<AppendNoteOutcome, HelpdeskError>;

    /// True when the backend is reachable and accepting requests.
    async fn health_check(&self) -> bool;
}
