//! In-process helpdesk
//!
//! Issues sequential ids (`TKT-1000`, `TKT-1001`, ...) and keeps every ticket
//! and appended note in memory. Nothing survives a restart.

use crate::constants::{MEMORY_HELPDESK_FIRST_ID, MEMORY_HELPDESK_ID_PREFIX};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use ticketbridge_core::{
    AppendNoteOutcome, Clock, CreatedTicket, HelpdeskCapability, HelpdeskError, NewTicket,
    NoteAuthor, Timestamp,
};

/// A ticket created through [`InMemoryHelpdesk`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTicket {
    pub created: CreatedTicket,
    pub ticket: NewTicket,
    pub notes: Vec<StoredNote>,
    pub created_at: Timestamp,
}

/// A note appended to a [`StoredTicket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub body: String,
    pub author: Option<NoteAuthor>,
    pub appended_at: Timestamp,
}

pub struct InMemoryHelpdesk {
    base_url: String,
    next_id: AtomicU64,
    tickets: DashMap<String, StoredTicket>,
    healthy: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryHelpdesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHelpdesk")
            .field("base_url", &self.base_url)
            .field("tickets", &self.tickets.len())
            .field("healthy", &self.healthy.load(Ordering::SeqCst))
            .finish()
    }
}

impl InMemoryHelpdesk {
    /// Ticket and note timestamps are read from `clock`.
    pub fn new(base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(MEMORY_HELPDESK_FIRST_ID),
            tickets: DashMap::new(),
            healthy: AtomicBool::new(true),
            clock,
        }
    }

    /// Snapshot of a ticket and its notes.
    pub fn ticket(&self, ticket_id: &str) -> Option<StoredTicket> {
        self.tickets.get(ticket_id).map(|entry| entry.value().clone())
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Flip the result of `health_check`, for readiness tests.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl HelpdeskCapability for InMemoryHelpdesk {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<CreatedTicket, HelpdeskError> {
        let number = self.next_id.fetch_add(1, Ordering::SeqCst);
        let ticket_id = format!("{}{}", MEMORY_HELPDESK_ID_PREFIX, number);
        let created = CreatedTicket {
            ticket_url: format!("{}/tickets/{}", self.base_url, ticket_id),
            ticket_id: ticket_id.clone(),
        };

        tracing::debug!(ticket_id = %ticket_id, category = %ticket.category, "In-memory ticket created");
        self.tickets.insert(
            ticket_id,
            StoredTicket {
                created: created.clone(),
                ticket,
                notes: Vec::new(),
                created_at: self.clock.now(),
            },
        );
        Ok(created)
    }

    async fn append_note(
        &self,
        ticket_id: &str,
        note: &str,
        author: Option<NoteAuthor>,
    ) -> Result<AppendNoteOutcome, HelpdeskError> {
        let mut entry = self
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| HelpdeskError::TicketNotFound {
                ticket_id: ticket_id.to_string(),
            })?;
        entry.notes.push(StoredNote {
            body: note.to_string(),
            author,
            appended_at: self.clock.now(),
        });
        let count = entry.notes.len();
        drop(entry);

        Ok(AppendNoteOutcome {
            success: true,
            message: format!("Note {} appended to {}", count, ticket_id),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
