//! Clock abstraction
//!
//! Every TTL, replay window and timestamp check reads time through [`Clock`]
//! so stores can be driven deterministically in tests without sleeping.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
///
/// Starts at a fixed instant and only moves when [`ManualClock::advance`] or
/// [`ManualClock::set`] is called.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// 2024-01-01 00:00:00 UTC
    pub const DEFAULT_EPOCH_SECS: i64 = 1_704_067_200;

    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn at_epoch_secs(secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(secs.saturating_mul(1000)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch_secs(Self::DEFAULT_EPOCH_SECS)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_default_epoch() {
        let clock = ManualClock::default();
        assert_eq!(clock.now_epoch_secs(), ManualClock::DEFAULT_EPOCH_SECS);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        clock.advance(Duration::from_secs(301));
        assert_eq!(
            clock.now_epoch_secs(),
            ManualClock::DEFAULT_EPOCH_SECS + 301
        );
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::default();
        let target = Utc.timestamp_opt(1_900_000_000, 0).single();
        if let Some(target) = target {
            clock.set(target);
            assert_eq!(clock.now(), target);
        }
    }

    #[test]
    fn test_system_clock_is_after_2024() {
        assert!(SystemClock.now_epoch_secs() > ManualClock::DEFAULT_EPOCH_SECS);
    }
}
