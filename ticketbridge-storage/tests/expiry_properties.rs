//! Expiry properties shared by the TTL stores: an entry is live strictly
//! before its lifetime has elapsed and gone from the moment it has.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_core::{compute_payload_hash, Category, Clock, DedupKeys, ManualClock, TicketRef};
use ticketbridge_storage::{
    IdempotencyCache, IdempotencyCheck, IdempotencyConfig, ReplayGuard, Sweep, TicketIndex,
};

fn ticket(clock: &ManualClock, id: &str) -> TicketRef {
    TicketRef {
        ticket_id: id.to_string(),
        ticket_url: format!("http://desk.local/tickets/{}", id),
        created_at: clock.now(),
        dedup_keys: DedupKeys::default(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn idempotency_record_lives_exactly_ttl(
        ttl_secs in 1u64..7_200,
        elapsed_secs in 0u64..14_400,
        key in "[a-z0-9-]{1,32}",
    ) {
        let clock = Arc::new(ManualClock::default());
        let cache = IdempotencyCache::new(
            IdempotencyConfig { ttl: Duration::from_secs(ttl_secs), max_keys: 16 },
            clock.clone(),
        );
        let hash = compute_payload_hash(key.as_bytes());
        let stored = cache.store(&key, hash, b"{}".to_vec(), 201);
        prop_assert!(stored.is_ok());

        clock.advance(Duration::from_secs(elapsed_secs));
        let live = elapsed_secs < ttl_secs;

        prop_assert_eq!(cache.get(&key).is_some(), live);
        prop_assert_eq!(
            matches!(cache.check(&key, &hash), Ok(IdempotencyCheck::Hit(_))),
            live
        );
    }

    #[test]
    fn idempotency_sweep_removes_only_expired(
        ttl_secs in 10u64..600,
        ages in prop::collection::vec(0u64..1_200, 1..12),
    ) {
        let clock = Arc::new(ManualClock::default());
        let cache = IdempotencyCache::new(
            IdempotencyConfig { ttl: Duration::from_secs(ttl_secs), max_keys: 64 },
            clock.clone(),
        );

        // Store oldest first so each record ends up `age` seconds old.
        let mut sorted = ages;
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let mut previous = sorted[0];
        for (i, age) in sorted.iter().enumerate() {
            clock.advance(Duration::from_secs(previous - age));
            previous = *age;
            let key = format!("key-{}", i);
            prop_assert!(cache
                .store(&key, compute_payload_hash(key.as_bytes()), Vec::new(), 200)
                .is_ok());
        }
        clock.advance(Duration::from_secs(previous));

        let expired = sorted.iter().filter(|age| **age >= ttl_secs).count();
        prop_assert_eq!(cache.sweep_expired(), expired);
        prop_assert_eq!(cache.len(), sorted.len() - expired);
    }

    #[test]
    fn ticket_index_entry_lives_exactly_ttl(
        ttl_secs in 1u64..28_800,
        elapsed_secs in 0u64..57_600,
        category_idx in 0usize..Category::ALL.len(),
    ) {
        let clock = Arc::new(ManualClock::default());
        let index = TicketIndex::new(Duration::from_secs(ttl_secs), clock.clone());
        let category = Category::ALL[category_idx];
        index.store(&ticket(&clock, "TKT-1"), Some("corr-1"), Some("+15550100"), Some(category));

        clock.advance(Duration::from_secs(elapsed_secs));
        let live = elapsed_secs < ttl_secs;

        prop_assert_eq!(index.find_by_correlation_key("corr-1").is_some(), live);
        prop_assert_eq!(index.find_by_caller_category("+15550100", category).is_some(), live);
    }

    #[test]
    fn replay_guard_forgets_after_window(
        window_secs in 1u64..900,
        elapsed_secs in 0u64..1_800,
        signature in "[0-9a-f]{64}",
    ) {
        let clock = Arc::new(ManualClock::default());
        let guard = ReplayGuard::new(Duration::from_secs(window_secs), clock.clone());
        prop_assert!(guard.record(&signature));

        clock.advance(Duration::from_secs(elapsed_secs));
        prop_assert_eq!(guard.is_replay(&signature), elapsed_secs < window_secs);
    }
}
