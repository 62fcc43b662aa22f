//! Ticket index
//!
//! Remembers created tickets under up to two deduplication keys: the external
//! correlation key and the (caller number, category) pair. Each index entry
//! carries its own timestamp and expires independently.

use crate::{is_expired, ttl_delta, Sweep};
use chrono::TimeDelta;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_core::{Category, Clock, TicketRef, Timestamp};

/// Default lifetime of an index entry (4 hours).
pub const DEFAULT_TICKET_TTL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone)]
struct IndexEntry {
    ticket: TicketRef,
    indexed_at: Timestamp,
}

pub struct TicketIndex {
    by_correlation: DashMap<String, IndexEntry>,
    by_caller: DashMap<(String, Category), IndexEntry>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TicketIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketIndex")
            .field("by_correlation", &self.by_correlation.len())
            .field("by_caller", &self.by_caller.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TicketIndex {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            by_correlation: DashMap::new(),
            by_caller: DashMap::new(),
            ttl: ttl_delta(ttl),
            clock,
        }
    }

    pub fn find_by_correlation_key(&self, key: &str) -> Option<TicketRef> {
        self.lookup(&self.by_correlation, key)
    }

    pub fn find_by_caller_category(&self, caller: &str, category: Category) -> Option<TicketRef> {
        self.lookup(&self.by_caller, &(caller.to_string(), category))
    }

    /// Index `ticket` under every key supplied. The caller path needs both a
    /// caller number and a category.
    pub fn store(
        &self,
        ticket: &TicketRef,
        correlation_key: Option<&str>,
        caller: Option<&str>,
        category: Option<Category>,
    ) {
        let entry = IndexEntry {
            ticket: ticket.clone(),
            indexed_at: self.clock.now(),
        };

        if let Some(key) = correlation_key {
            self.by_correlation.insert(key.to_string(), entry.clone());
        }
        if let (Some(caller), Some(category)) = (caller, category) {
            self.by_caller.insert((caller.to_string(), category), entry);
        }
    }

    /// Number of correlation-key entries.
    pub fn correlation_len(&self) -> usize {
        self.by_correlation.len()
    }

    /// Number of caller+category entries.
    pub fn caller_len(&self) -> usize {
        self.by_caller.len()
    }

    fn lookup<K, Q>(&self, map: &DashMap<K, IndexEntry>, key: &Q) -> Option<TicketRef>
    where
        K: Eq + Hash + std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = self.clock.now();
        let found = map
            .get(key)
            .map(|entry| (entry.ticket.clone(), is_expired(entry.indexed_at, now, self.ttl)));

        match found {
            Some((ticket, false)) => Some(ticket),
            Some((_, true)) => {
                map.remove_if(key, |_, entry| is_expired(entry.indexed_at, now, self.ttl));
                None
            }
            None => None,
        }
    }
}

impl Sweep for TicketIndex {
    fn store_name(&self) -> &'static str {
        "ticket_index"
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.len();
        self.by_correlation
            .retain(|_, entry| !is_expired(entry.indexed_at, now, self.ttl));
        self.by_caller
            .retain(|_, entry| !is_expired(entry.indexed_at, now, self.ttl));
        before.saturating_sub(self.len())
    }

    fn len(&self) -> usize {
        self.by_correlation.len() + self.by_caller.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbridge_core::{DedupKeys, ManualClock};

    fn ticket(id: &str, clock: &ManualClock) -> TicketRef {
        TicketRef {
            ticket_id: id.to_string(),
            ticket_url: format!("https://helpdesk.test/tickets/{}", id),
            created_at: clock.now(),
            dedup_keys: DedupKeys::default(),
        }
    }

    fn index() -> (TicketIndex, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TicketIndex::new(DEFAULT_TICKET_TTL, clock.clone()), clock)
    }

    #[test]
    fn test_store_under_both_keys() {
        let (index, clock) = index();
        let t = ticket("TKT-1000", &clock);
        index.store(&t, Some("oa-12345"), Some("+12345678900"), Some(Category::WiFi));

        assert_eq!(index.find_by_correlation_key("oa-12345"), Some(t.clone()));
        assert_eq!(
            index.find_by_caller_category("+12345678900", Category::WiFi),
            Some(t)
        );
        assert_eq!(index.find_by_caller_category("+12345678900", Category::Outage), None);
    }

    #[test]
    fn test_caller_only_ticket_not_indexed_by_correlation() {
        let (index, clock) = index();
        let t = ticket("TKT-1000", &clock);
        index.store(&t, None, Some("+12345678900"), Some(Category::Wiring));

        assert_eq!(index.correlation_len(), 0);
        assert_eq!(index.caller_len(), 1);
    }

    #[test]
    fn test_caller_without_category_is_not_indexed() {
        let (index, clock) = index();
        index.store(&ticket("TKT-1000", &clock), None, Some("+12345678900"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_expired_lookup_evicts_only_that_path() {
        let (index, clock) = index();
        let t = ticket("TKT-1000", &clock);
        index.store(&t, Some("oa-12345"), Some("+12345678900"), Some(Category::WiFi));

        clock.advance(DEFAULT_TICKET_TTL);

        assert_eq!(index.find_by_correlation_key("oa-12345"), None);
        assert_eq!(index.correlation_len(), 0);
        // The other path is untouched until it is looked up or swept.
        assert_eq!(index.caller_len(), 1);
    }

    #[test]
    fn test_entries_expire_independently() {
        let (index, clock) = index();
        let t = ticket("TKT-1000", &clock);
        index.store(&t, Some("oa-12345"), None, None);
        clock.advance(Duration::from_secs(3 * 60 * 60));
        index.store(&t, None, Some("+12345678900"), Some(Category::Outage));
        clock.advance(Duration::from_secs(60 * 60));

        assert_eq!(index.find_by_correlation_key("oa-12345"), None);
        assert_eq!(
            index.find_by_caller_category("+12345678900", Category::Outage),
            Some(t)
        );
    }

    #[test]
    fn test_sweep() {
        let (index, clock) = index();
        index.store(
            &ticket("TKT-1000", &clock),
            Some("oa-aaaaaa"),
            Some("+12345678900"),
            Some(Category::WiFi),
        );
        clock.advance(Duration::from_secs(2 * 60 * 60));
        index.store(&ticket("TKT-1001", &clock), Some("oa-bbbbbb"), None, None);
        clock.advance(Duration::from_secs(2 * 60 * 60));

        assert_eq!(index.sweep_expired(), 2);
        assert_eq!(index.len(), 1);
        assert!(index.find_by_correlation_key("oa-bbbbbb").is_some());
    }
}
