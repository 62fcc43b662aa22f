//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ticketbridge_core::{Clock, HelpdeskCapability};
use ticketbridge_storage::{IdempotencyCache, ReplayGuard, Sweep, TicketIndex};

use crate::auth::{AuthConfig, Authenticator};
use crate::config::{ApiConfig, CacheConfig};
use crate::constants::DEFAULT_RATE_LIMIT_SWEEP_SECS;
use crate::middleware::{AuthMiddlewareState, IdempotencyState, RateLimitState};
use crate::services::TicketService;

/// Application-wide state shared across all routes.
///
/// Every store is constructed here once and handed out by `Arc`; the sweep
/// jobs spawned in `main` hold clones of the same stores.
#[derive(Clone)]
pub struct AppState {
    pub api_config: Arc<ApiConfig>,
    pub cache_config: Arc<CacheConfig>,
    pub authenticator: Arc<Authenticator>,
    pub idempotency: Arc<IdempotencyCache>,
    pub ticket_index: Arc<TicketIndex>,
    pub replay_guard: Arc<ReplayGuard>,
    pub rate_limiter: RateLimitState,
    pub tickets: Arc<TicketService>,
    pub helpdesk: Arc<dyn HelpdeskCapability>,
    pub start_time: Instant,
}

crate::impl_from_ref!(Arc<ApiConfig>, api_config);
crate::impl_from_ref!(Arc<TicketService>, tickets);
crate::impl_from_ref!(Arc<dyn HelpdeskCapability>, helpdesk);
crate::impl_from_ref!(Instant, start_time);

impl AppState {
    pub fn new(
        api_config: ApiConfig,
        auth_config: AuthConfig,
        cache_config: CacheConfig,
        helpdesk: Arc<dyn HelpdeskCapability>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let replay_guard = Arc::new(ReplayGuard::new(auth_config.replay_window, clock.clone()));
        let idempotency = Arc::new(IdempotencyCache::new(cache_config.idempotency(), clock.clone()));
        let ticket_index = Arc::new(TicketIndex::new(cache_config.ticket_ttl, clock.clone()));
        let authenticator = Arc::new(Authenticator::new(
            auth_config,
            replay_guard.clone(),
            clock.clone(),
        ));
        let tickets = Arc::new(TicketService::new(
            helpdesk.clone(),
            ticket_index.clone(),
            clock,
        ));

        let api_config = Arc::new(api_config);
        let rate_limiter = RateLimitState::new(api_config.clone());

        Self {
            api_config,
            cache_config: Arc::new(cache_config),
            authenticator,
            idempotency,
            ticket_index,
            replay_guard,
            rate_limiter,
            tickets,
            helpdesk,
            start_time: Instant::now(),
        }
    }

    pub fn auth_middleware_state(&self) -> AuthMiddlewareState {
        AuthMiddlewareState::new(self.authenticator.clone(), self.api_config.max_body_bytes)
    }

    pub fn idempotency_state(&self) -> IdempotencyState {
        IdempotencyState::new(self.idempotency.clone(), self.api_config.max_body_bytes)
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limiter.clone()
    }

    /// Each store with the interval its expired entries are swept at.
    pub fn sweep_schedule(&self) -> Vec<(Arc<dyn Sweep>, Duration)> {
        vec![
            (
                self.idempotency.clone() as Arc<dyn Sweep>,
                self.cache_config.idempotency_sweep_interval,
            ),
            (
                self.ticket_index.clone() as Arc<dyn Sweep>,
                self.cache_config.ticket_sweep_interval,
            ),
            (
                self.replay_guard.clone() as Arc<dyn Sweep>,
                self.cache_config.replay_sweep_interval,
            ),
            (
                Arc::new(self.rate_limiter.clone()) as Arc<dyn Sweep>,
                Duration::from_secs(DEFAULT_RATE_LIMIT_SWEEP_SECS),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpdesk::InMemoryHelpdesk;
    use ticketbridge_core::ManualClock;

    #[test]
    fn test_sweep_schedule_covers_every_store() {
        let state = AppState::new(
            ApiConfig::default(),
            AuthConfig::shared_secret("tok"),
            CacheConfig::default(),
            Arc::new(InMemoryHelpdesk::new(
                "http://desk.local",
                Arc::new(ManualClock::default()),
            )),
            Arc::new(ManualClock::default()),
        );

        let schedule = state.sweep_schedule();
        let names: Vec<_> = schedule.iter().map(|(store, _)| store.store_name()).collect();
        assert_eq!(
            names,
            vec!["idempotency", "ticket_index", "replay_guard", "rate_limiter"]
        );
        assert_eq!(schedule[0].1, Duration::from_secs(300));
        assert_eq!(schedule[1].1, Duration::from_secs(1_800));
        assert_eq!(schedule[2].1, Duration::from_secs(60));
        assert_eq!(schedule[3].1, Duration::from_secs(60));
    }
}
