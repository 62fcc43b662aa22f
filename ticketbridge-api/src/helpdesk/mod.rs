//! Helpdesk backends
//!
//! [`HttpHelpdesk`] talks to a JSON helpdesk API; [`InMemoryHelpdesk`] keeps
//! tickets in process memory for local development and tests. Which one runs
//! is decided once at startup from [`HelpdeskConfig`].

mod http;
mod memory;

pub use http::HttpHelpdesk;
pub use memory::{InMemoryHelpdesk, StoredNote, StoredTicket};

use crate::config::HelpdeskConfig;
use std::sync::Arc;
use ticketbridge_core::{Clock, ConfigError, HelpdeskCapability};

/// Build the helpdesk selected by `config`.
pub fn from_config(
    config: &HelpdeskConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn HelpdeskCapability>, ConfigError> {
    match &config.url {
        Some(_) => Ok(Arc::new(HttpHelpdesk::new(config)?)),
        None => {
            tracing::warn!(
                base_url = %config.memory_base_url,
                "TICKETBRIDGE_HELPDESK_URL not set, tickets are kept in memory only"
            );
            Ok(Arc::new(InMemoryHelpdesk::new(
                config.memory_base_url.clone(),
                clock,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbridge_core::SystemClock;

    #[test]
    fn test_from_config_selects_backend() -> Result<(), String> {
        let memory = from_config(&HelpdeskConfig::default(), Arc::new(SystemClock))
            .map_err(|e| e.to_string())?;
        assert_eq!(memory.name(), "memory");

        let http = from_config(
            &HelpdeskConfig {
                url: Some("http://helpdesk.internal".to_string()),
                ..HelpdeskConfig::default()
            },
            Arc::new(SystemClock),
        )
        .map_err(|e| e.to_string())?;
        assert_eq!(http.name(), "http");
        Ok(())
    }
}
