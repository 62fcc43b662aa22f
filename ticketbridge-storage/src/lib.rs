//! TicketBridge Storage - In-Memory TTL Stores
//!
//! Three explicitly constructed stores back the ingest pipeline:
//!
//! - [`IdempotencyCache`]: request-level replay of responses by client key
//! - [`TicketIndex`]: ticket deduplication by correlation key or caller+category
//! - [`ReplayGuard`]: signed-webhook signatures seen within the replay window
//!
//! All three are `DashMap`-backed, read time through an injected
//! [`Clock`](ticketbridge_core::Clock), treat expired entries as absent on
//! read, and implement [`Sweep`] so a background job can evict expired
//! entries. No method returns or holds a map guard across a call boundary.

pub mod idempotency;
pub mod replay_guard;
pub mod ticket_index;

pub use idempotency::{IdempotencyCache, IdempotencyCheck, IdempotencyConfig, IdempotencyRecord};
pub use replay_guard::ReplayGuard;
pub use ticket_index::TicketIndex;

use chrono::TimeDelta;
use std::time::Duration;
use ticketbridge_core::Timestamp;

/// A store whose expired entries can be evicted in bulk.
pub trait Sweep: Send + Sync {
    /// Store name used in logs and metric labels.
    fn store_name(&self) -> &'static str;

    /// Remove every expired entry, returning how many were removed.
    fn sweep_expired(&self) -> usize;

    /// Number of entries currently held, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn ttl_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}

/// An entry created at `created_at` is expired once `ttl` has fully elapsed.
pub(crate) fn is_expired(created_at: Timestamp, now: Timestamp, ttl: TimeDelta) -> bool {
    now.signed_duration_since(created_at) >= ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let start = Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default();
        let ttl = ttl_delta(Duration::from_secs(300));
        assert!(!is_expired(start, start + TimeDelta::seconds(299), ttl));
        assert!(is_expired(start, start + TimeDelta::seconds(300), ttl));
    }

    #[test]
    fn test_oversized_ttl_saturates() {
        assert_eq!(ttl_delta(Duration::MAX), TimeDelta::MAX);
    }
}
