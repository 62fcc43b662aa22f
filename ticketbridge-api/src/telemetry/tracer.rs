//! Tracing Subscriber Initialization
//!
//! JSON log lines on stdout, filtered by `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ticketbridge_api=debug,tower_http=info,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Expose `GET /metrics`
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("TICKETBRIDGE_SERVICE_NAME")
                .unwrap_or_else(|_| "ticketbridge-api".to_string()),
            service_version: std::env::var("TICKETBRIDGE_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: std::env::var("TICKETBRIDGE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("TICKETBRIDGE_METRICS_ENABLED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(true),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup, before anything logs. A second call fails because a
/// global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ApiError::internal(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        environment = %config.environment,
        metrics_enabled = config.metrics_enabled,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{env_lock, EnvVarGuard};

    #[test]
    fn test_telemetry_config_default() {
        let _lock = env_lock();
        let _name = EnvVarGuard::set("TICKETBRIDGE_SERVICE_NAME", None);
        let _metrics = EnvVarGuard::set("TICKETBRIDGE_METRICS_ENABLED", None);
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "ticketbridge-api");
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_telemetry_config_metrics_toggle() {
        let _lock = env_lock();
        let _metrics = EnvVarGuard::set("TICKETBRIDGE_METRICS_ENABLED", Some("false"));
        assert!(!TelemetryConfig::default().metrics_enabled);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
