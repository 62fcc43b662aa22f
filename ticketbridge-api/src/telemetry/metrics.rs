//! Prometheus Metrics Definitions
//!
//! Defines all TicketBridge metrics with their labels.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<TicketBridgeMetrics>> = Lazy::new(TicketBridgeMetrics::new);

/// Container for all TicketBridge metrics.
#[derive(Clone)]
pub struct TicketBridgeMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Ticket outcomes - labels: outcome (created/deduplicated), path
    pub tickets_total: CounterVec,

    /// Idempotency cache activity - labels: result (replay/conflict/stored)
    pub idempotency_events_total: CounterVec,

    /// Rejected authentication attempts - labels: reason
    pub auth_failures_total: CounterVec,

    /// Tool call counter - labels: tool, status
    pub tool_calls_total: CounterVec,

    /// Entries removed by background sweeps - labels: store
    pub sweep_evictions_total: CounterVec,
}

impl TicketBridgeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "ticketbridge_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "ticketbridge_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal(format!("Failed to register http_request_duration_seconds: {}", e))
            })?,

            tickets_total: register_counter_vec!(
                "ticketbridge_tickets_total",
                "Escalations resolved to a ticket, by outcome",
                &["outcome", "path"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register tickets_total: {}", e)))?,

            idempotency_events_total: register_counter_vec!(
                "ticketbridge_idempotency_events_total",
                "Idempotency cache replays, conflicts and stores",
                &["result"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register idempotency_events_total: {}", e)))?,

            auth_failures_total: register_counter_vec!(
                "ticketbridge_auth_failures_total",
                "Rejected authentication attempts",
                &["reason"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register auth_failures_total: {}", e)))?,

            tool_calls_total: register_counter_vec!(
                "ticketbridge_tool_calls_total",
                "Total tool invocations",
                &["tool", "status"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register tool_calls_total: {}", e)))?,

            sweep_evictions_total: register_counter_vec!(
                "ticketbridge_sweep_evictions_total",
                "Expired entries removed by background sweeps",
                &["store"]
            )
            .map_err(|e| ApiError::internal(format!("Failed to register sweep_evictions_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a newly created ticket.
    pub fn record_ticket_created(&self, path: &str) {
        self.tickets_total.with_label_values(&["created", path]).inc();
    }

    /// Record an escalation answered with an existing ticket.
    pub fn record_ticket_deduplicated(&self, path: &str) {
        self.tickets_total
            .with_label_values(&["deduplicated", path])
            .inc();
    }

    pub fn record_idempotency(&self, result: &str) {
        self.idempotency_events_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn record_auth_failure(&self, reason: &str) {
        self.auth_failures_total.with_label_values(&[reason]).inc();
    }

    /// Record a tool call.
    pub fn record_tool_call(&self, tool: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.tool_calls_total
            .with_label_values(&[tool, status])
            .inc();
    }

    pub fn record_sweep_evictions(&self, store: &str, evicted: usize) {
        self.sweep_evictions_total
            .with_label_values(&[store])
            .inc_by(evicted as f64);
    }
}

/// Run `f` against the global metrics, skipping silently if registration failed.
pub fn with_metrics(f: impl FnOnce(&TicketBridgeMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so an idle process still exposes every series.
    if let Err(err) = METRICS.as_ref() {
        tracing::warn!(error = %err, "Metrics registry unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e).into_bytes(),
        ),
    }
}
