//! TicketBridge Telemetry - Observability Infrastructure
//!
//! Structured JSON logging and Prometheus metrics for the API layer.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, with_metrics, TicketBridgeMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig, DEFAULT_LOG_FILTER};
