//! Idempotency cache
//!
//! Maps a client-supplied `Idempotency-Key` to the fingerprint of the payload
//! that first used it and the response that was returned. For a given key the
//! payload hash never changes: reuse with a different payload is a conflict.

use crate::{is_expired, ttl_delta, Sweep};
use chrono::TimeDelta;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_core::{Clock, IdempotencyConflict, PayloadHash, Timestamp};

/// Idempotency cache settings.
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// Lifetime of a record from creation (default: 15 minutes)
    pub ttl: Duration,
    /// Maximum number of keys held; the oldest record is evicted beyond this
    /// (default: 10 000)
    pub max_keys: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            max_keys: 10_000,
        }
    }
}

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub payload_hash: PayloadHash,
    /// Response body exactly as first sent.
    pub response: Vec<u8>,
    pub status_code: u16,
    pub created_at: Timestamp,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyCheck {
    Hit(IdempotencyRecord),
    Miss,
}

pub struct IdempotencyCache {
    records: DashMap<String, IdempotencyRecord>,
    ttl: TimeDelta,
    max_keys: usize,
    clock: Arc<dyn Clock>,
    capacity_evictions: AtomicU64,
}

impl std::fmt::Debug for IdempotencyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyCache")
            .field("records", &self.records.len())
            .field("ttl", &self.ttl)
            .field("max_keys", &self.max_keys)
            .finish()
    }
}

impl IdempotencyCache {
    pub fn new(config: IdempotencyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            ttl: ttl_delta(config.ttl),
            max_keys: config.max_keys.max(1),
            clock,
            capacity_evictions: AtomicU64::new(0),
        }
    }

    /// Look up `key`, failing with a conflict if it was stored under a
    /// different payload hash. Expired records are treated as absent.
    pub fn check(
        &self,
        key: &str,
        payload_hash: &PayloadHash,
    ) -> Result<IdempotencyCheck, IdempotencyConflict> {
        match self.get(key) {
            Some(record) if record.payload_hash != *payload_hash => Err(IdempotencyConflict {
                key: key.to_string(),
            }),
            Some(record) => Ok(IdempotencyCheck::Hit(record)),
            None => Ok(IdempotencyCheck::Miss),
        }
    }

    /// Live record for `key`, if any. Removes the record if it has expired.
    pub fn get(&self, key: &str) -> Option<IdempotencyRecord> {
        let now = self.clock.now();
        let found = self
            .records
            .get(key)
            .map(|record| (record.value().clone(), is_expired(record.created_at, now, self.ttl)));

        match found {
            Some((record, false)) => Some(record),
            Some((_, true)) => {
                self.records
                    .remove_if(key, |_, record| is_expired(record.created_at, now, self.ttl));
                None
            }
            None => None,
        }
    }

    /// Record the response for `key`.
    ///
    /// Overwrites a live record with the same payload hash; a live record with
    /// a different hash is left untouched and a conflict is returned.
    pub fn store(
        &self,
        key: &str,
        payload_hash: PayloadHash,
        response: Vec<u8>,
        status_code: u16,
    ) -> Result<(), IdempotencyConflict> {
        let now = self.clock.now();

        if !self.records.contains_key(key) && self.records.len() >= self.max_keys {
            self.evict_oldest();
        }

        let record = IdempotencyRecord {
            key: key.to_string(),
            payload_hash,
            response,
            status_code,
            created_at: now,
        };

        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut existing) => {
                let live = !is_expired(existing.get().created_at, now, self.ttl);
                if live && existing.get().payload_hash != payload_hash {
                    return Err(IdempotencyConflict {
                        key: key.to_string(),
                    });
                }
                existing.insert(record);
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(())
    }

    /// Remove the record for `key`. Returns whether one was present.
    pub fn clear(&self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    pub fn clear_all(&self) {
        self.records.clear();
    }

    /// Records evicted because the key cap was reached.
    pub fn capacity_evictions(&self) -> u64 {
        self.capacity_evictions.load(Ordering::Relaxed)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .records
            .iter()
            .min_by_key(|record| record.created_at)
            .map(|record| record.key().clone());

        if let Some(key) = oldest {
            if self.records.remove(&key).is_some() {
                self.capacity_evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(idempotency_key = %key, "Evicted oldest idempotency record at capacity");
            }
        }
    }
}

impl Sweep for IdempotencyCache {
    fn store_name(&self) -> &'static str {
        "idempotency"
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records
            .retain(|_, record| !is_expired(record.created_at, now, self.ttl));
        before.saturating_sub(self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbridge_core::{compute_payload_hash, ManualClock};

    fn cache_with_clock(config: IdempotencyConfig) -> (IdempotencyCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (IdempotencyCache::new(config, clock.clone()), clock)
    }

    #[test]
    fn test_miss_then_hit_returns_identical_bytes() -> Result<(), String> {
        let (cache, _) = cache_with_clock(IdempotencyConfig::default());
        let hash = compute_payload_hash(b"payload");

        assert_eq!(cache.check("k1", &hash), Ok(IdempotencyCheck::Miss));
        cache
            .store("k1", hash, b"{\"b\":1,\"a\":2}".to_vec(), 200)
            .map_err(|e| e.to_string())?;

        match cache.check("k1", &hash).map_err(|e| e.to_string())? {
            IdempotencyCheck::Hit(record) => {
                assert_eq!(record.response, b"{\"b\":1,\"a\":2}".to_vec());
                assert_eq!(record.status_code, 200);
            }
            IdempotencyCheck::Miss => return Err("expected hit".to_string()),
        }
        Ok(())
    }

    #[test]
    fn test_different_hash_conflicts_on_check_and_store() -> Result<(), String> {
        let (cache, _) = cache_with_clock(IdempotencyConfig::default());
        let first = compute_payload_hash(b"one");
        let second = compute_payload_hash(b"two");

        cache.store("k1", first, b"{}".to_vec(), 200).map_err(|e| e.to_string())?;

        assert!(cache.check("k1", &second).is_err());
        assert!(cache.store("k1", second, b"{}".to_vec(), 200).is_err());

        // Original record is untouched.
        assert_eq!(
            cache.get("k1").map(|r| r.payload_hash),
            Some(first)
        );
        Ok(())
    }

    #[test]
    fn test_same_hash_overwrites() -> Result<(), String> {
        let (cache, _) = cache_with_clock(IdempotencyConfig::default());
        let hash = compute_payload_hash(b"one");
        cache.store("k1", hash, b"first".to_vec(), 200).map_err(|e| e.to_string())?;
        cache.store("k1", hash, b"second".to_vec(), 201).map_err(|e| e.to_string())?;
        assert_eq!(cache.get("k1").map(|r| r.response), Some(b"second".to_vec()));
        Ok(())
    }

    #[test]
    fn test_expired_record_is_absent_and_reusable() -> Result<(), String> {
        let (cache, clock) = cache_with_clock(IdempotencyConfig::default());
        let first = compute_payload_hash(b"one");
        let second = compute_payload_hash(b"two");
        cache.store("k1", first, b"{}".to_vec(), 200).map_err(|e| e.to_string())?;

        clock.advance(Duration::from_secs(15 * 60));

        assert_eq!(cache.check("k1", &second), Ok(IdempotencyCheck::Miss));
        assert_eq!(Sweep::len(&cache), 0);
        cache.store("k1", second, b"{}".to_vec(), 200).map_err(|e| e.to_string())?;
        Ok(())
    }

    #[test]
    fn test_sweep_removes_only_expired() -> Result<(), String> {
        let (cache, clock) = cache_with_clock(IdempotencyConfig::default());
        let hash = compute_payload_hash(b"x");
        cache.store("old", hash, vec![], 200).map_err(|e| e.to_string())?;
        clock.advance(Duration::from_secs(10 * 60));
        cache.store("new", hash, vec![], 200).map_err(|e| e.to_string())?;
        clock.advance(Duration::from_secs(6 * 60));

        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
        Ok(())
    }

    #[test]
    fn test_cap_evicts_oldest() -> Result<(), String> {
        let (cache, clock) = cache_with_clock(IdempotencyConfig {
            ttl: Duration::from_secs(900),
            max_keys: 2,
        });
        let hash = compute_payload_hash(b"x");
        cache.store("a", hash, vec![], 200).map_err(|e| e.to_string())?;
        clock.advance(Duration::from_secs(1));
        cache.store("b", hash, vec![], 200).map_err(|e| e.to_string())?;
        clock.advance(Duration::from_secs(1));
        cache.store("c", hash, vec![], 200).map_err(|e| e.to_string())?;

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.capacity_evictions(), 1);
        Ok(())
    }

    #[test]
    fn test_clear() -> Result<(), String> {
        let (cache, _) = cache_with_clock(IdempotencyConfig::default());
        let hash = compute_payload_hash(b"x");
        cache.store("k", hash, vec![], 200).map_err(|e| e.to_string())?;
        assert!(cache.clear("k"));
        assert!(!cache.clear("k"));
        assert_eq!(cache.check("k", &hash), Ok(IdempotencyCheck::Miss));
        Ok(())
    }
}
