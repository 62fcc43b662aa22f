//! Replay guard for signed webhooks
//!
//! Holds every accepted signature until the replay window has passed. After
//! that the timestamp check rejects the request anyway.

use crate::{is_expired, ttl_delta, Sweep};
use chrono::TimeDelta;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_core::{Clock, Timestamp};

pub struct ReplayGuard {
    seen: DashMap<String, Timestamp>,
    window: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("seen", &self.seen.len())
            .field("window", &self.window)
            .finish()
    }
}

impl ReplayGuard {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            seen: DashMap::new(),
            window: ttl_delta(window),
            clock,
        }
    }

    /// True if `signature` was accepted within the window.
    pub fn is_replay(&self, signature: &str) -> bool {
        let now = self.clock.now();
        self.seen
            .get(signature)
            .is_some_and(|seen_at| !is_expired(*seen_at, now, self.window))
    }

    /// Record an accepted signature.
    ///
    /// Returns `false` if a live record already exists, which means another
    /// request carrying the same signature won the race.
    pub fn record(&self, signature: &str) -> bool {
        let now = self.clock.now();
        match self.seen.entry(signature.to_string()) {
            Entry::Occupied(mut existing) => {
                if is_expired(*existing.get(), now, self.window) {
                    existing.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }
}

impl Sweep for ReplayGuard {
    fn store_name(&self) -> &'static str {
        "replay_guard"
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.seen.len();
        self.seen
            .retain(|_, seen_at| !is_expired(*seen_at, now, self.window));
        before.saturating_sub(self.seen.len())
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}
