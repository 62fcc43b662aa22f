//! TicketBridge Test Utilities
//!
//! Shared test infrastructure for the TicketBridge workspace:
//! - Helpdesk doubles that record or fail every call
//! - Proptest generators for notes and escalation fields
//! - Webhook signing as a sender would do it
//! - Fixtures for common scenarios

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub use ticketbridge_core::{
    AppendNoteOutcome, Category, Confidence, CreatedTicket, EscalationReason, EscalationRequest,
    HelpdeskCapability, HelpdeskError, NewTicket, Note, NoteAuthor, Source,
};

// ============================================================================
// HELPDESK DOUBLES
// ============================================================================

/// A note appended through [`RecordingHelpdesk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNote {
    pub ticket_id: String,
    pub note: String,
    pub author: Option<NoteAuthor>,
}

/// Helpdesk that succeeds and remembers every request.
///
/// Ticket ids are `REC-1`, `REC-2`, ... in creation order.
#[derive(Debug, Default)]
pub struct RecordingHelpdesk {
    next_id: AtomicU64,
    created: Mutex<Vec<NewTicket>>,
    notes: Mutex<Vec<RecordedNote>>,
}

impl RecordingHelpdesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<NewTicket> {
        self.created
            .lock()
            .map(|tickets| tickets.clone())
            .unwrap_or_default()
    }

    pub fn notes(&self) -> Vec<RecordedNote> {
        self.notes
            .lock()
            .map(|notes| notes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HelpdeskCapability for RecordingHelpdesk {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<CreatedTicket, HelpdeskError> {
        let id = format!("REC-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Ok(mut created) = self.created.lock() {
            created.push(ticket);
        }
        Ok(CreatedTicket {
            ticket_url: format!("http://recording.test/tickets/{}", id),
            ticket_id: id,
        })
    }

    async fn append_note(
        &self,
        ticket_id: &str,
        note: &str,
        author: Option<NoteAuthor>,
    ) -> Result<AppendNoteOutcome, HelpdeskError> {
        if let Ok(mut notes) = self.notes.lock() {
            notes.push(RecordedNote {
                ticket_id: ticket_id.to_string(),
                note: note.to_string(),
                author,
            });
        }
        Ok(AppendNoteOutcome {
            success: true,
            message: "Note recorded".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Helpdesk whose every call fails with the given upstream status.
#[derive(Debug, Clone, Copy)]
pub struct FailingHelpdesk {
    status: u16,
}

impl FailingHelpdesk {
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    fn error(&self) -> HelpdeskError {
        HelpdeskError::Upstream {
            status: self.status,
            message: "simulated helpdesk failure".to_string(),
        }
    }
}

#[async_trait]
impl HelpdeskCapability for FailingHelpdesk {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn create_ticket(&self, _ticket: NewTicket) -> Result<CreatedTicket, HelpdeskError> {
        Err(self.error())
    }

    async fn append_note(
        &self,
        _ticket_id: &str,
        _note: &str,
        _author: Option<NoteAuthor>,
    ) -> Result<AppendNoteOutcome, HelpdeskError> {
        Err(self.error())
    }

    async fn health_check(&self) -> bool {
        false
    }
}

// ============================================================================
// WEBHOOK SIGNING
// ============================================================================

/// `x-signature` value for `body` sent at `timestamp`: `sha256=` followed by
/// the hex HMAC-SHA256 of `timestamp || body`.
pub fn sign_body(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_category() -> impl Strategy<Value = Category> {
        proptest::sample::select(Category::ALL.to_vec())
    }

    pub fn arb_reason() -> impl Strategy<Value = EscalationReason> {
        proptest::sample::select(EscalationReason::ALL.to_vec())
    }

    pub fn arb_confidence() -> impl Strategy<Value = Confidence> {
        (0u8..=100).prop_map(|h| Confidence::from_hundredths(h).unwrap_or_default())
    }

    /// Single-line summary text with at least one visible character.
    pub fn arb_summary() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ,.]{0,80}".prop_map(|s| s.trim_end().to_string())
    }

    /// A well-formed four-line note.
    pub fn arb_note() -> impl Strategy<Value = Note> {
        (arb_category(), arb_reason(), arb_summary(), arb_confidence()).prop_filter_map(
            "note must render",
            |(category, reason, summary, confidence)| {
                Note::render(category, reason, &summary, confidence).ok()
            },
        )
    }

    /// E.164 caller numbers.
    pub fn arb_caller_number() -> impl Strategy<Value = String> {
        "\\+[1-9][0-9]{7,13}"
    }

    /// Correlation keys in the accepted shape.
    pub fn arb_oa_key() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{6,64}"
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;

    pub const OA_KEY: &str = "oa-12345";
    pub const CALLER_NUMBER: &str = "+12345678900";

    /// Note text for a CGNAT escalation.
    pub fn sample_note_text() -> String {
        "Category: CGNAT\n\
         Escalation Reason: OutOfScope\n\
         Summary: Caller cannot port-forward for a game server behind CGNAT\n\
         Confidence: 0.85"
            .to_string()
    }

    /// A varied note for follow-up calls on the same escalation.
    pub fn follow_up_note_text() -> String {
        "Category: CGNAT\n\
         Escalation Reason: OutOfScope\n\
         Summary: Caller called back, still no public IP\n\
         Confidence: 0.90"
            .to_string()
    }

    pub fn escalation_request() -> EscalationRequest {
        EscalationRequest {
            description: "Caller cannot port-forward behind CGNAT".to_string(),
            correlation_key: Some(OA_KEY.to_string()),
            caller_number: Some(CALLER_NUMBER.to_string()),
            source: Source::VoiceAgent,
            ..EscalationRequest::default()
        }
    }

    /// JSON body for `POST /api/v1/escalations`.
    pub fn ingest_body(note: &str) -> serde_json::Value {
        serde_json::json!({
            "note": note,
            "callerNumber": CALLER_NUMBER,
            "oaKey": OA_KEY,
            "source": "VoiceAgent",
        })
    }
}
