//! Prometheus metrics for observability.
//!
//! - HTTP request metrics (latency, counts, errors)
//! - WebSocket connection metrics
//! - Queue operation counters and live queue gauges

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "figaro_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("figaro_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "figaro_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("figaro_auth_failures_total", "Total authentication failures"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "figaro_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "figaro_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by event action.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("figaro_ws_messages_sent_total", "WebSocket messages sent"),
        &["action"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "figaro_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics
// =============================================================================

/// Customers admitted since startup.
pub static QUEUE_JOINS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("figaro_queue_joins_total", "Customers admitted to the queue").unwrap()
});

/// Services completed since startup.
pub static QUEUE_COMPLETIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("figaro_queue_completions_total", "Services completed").unwrap()
});

/// Tickets cancelled since startup.
pub static QUEUE_CANCELLATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("figaro_queue_cancellations_total", "Tickets cancelled").unwrap()
});

/// Rejected joins by reason (validation, shop_closed, already_queued).
pub static QUEUE_JOINS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("figaro_queue_joins_rejected_total", "Rejected join attempts"),
        &["reason"],
    )
    .unwrap()
});

/// Active tickets right now (collected dynamically).
pub static QUEUE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("figaro_queue_active", "Currently active tickets").unwrap()
});

/// Waiting tickets right now (collected dynamically).
pub static QUEUE_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("figaro_queue_waiting", "Currently waiting tickets").unwrap()
});

/// Shop gate state (1 = open, 0 = closed), collected dynamically.
pub static SHOP_OPEN: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("figaro_shop_open", "Whether the shop is open (1) or closed (0)").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Queue
    registry
        .register(Box::new(QUEUE_JOINS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_COMPLETIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_CANCELLATIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_JOINS_REJECTED_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(QUEUE_ACTIVE.clone())).unwrap();
    registry.register(Box::new(QUEUE_WAITING.clone())).unwrap();
    registry.register(Box::new(SHOP_OPEN.clone())).unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh live queue gauges from current state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(stats) = state.engine().stats() {
        QUEUE_ACTIVE.set(stats.active_count as i64);
        QUEUE_WAITING.set(stats.waiting_count as i64);
        SHOP_OPEN.set(if stats.is_open { 1 } else { 0 });
    }
}

/// Normalize a path for metric labels (replace per-customer segments).
pub fn normalize_path(path: &str) -> String {
    // Phone numbers and queue numbers both appear as path segments.
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/(\+|%2B)?\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$2");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_queue_number() {
        let path = "/api/v1/queue/serving/12";
        assert_eq!(normalize_path(path), "/api/v1/queue/serving/{id}");
    }

    #[test]
    fn test_normalize_path_phone() {
        assert_eq!(
            normalize_path("/api/v1/queue/position/+919876543210"),
            "/api/v1/queue/position/{id}"
        );
        assert_eq!(
            normalize_path("/api/v1/queue/position/%2B919876543210"),
            "/api/v1/queue/position/{id}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/queue/stats";
        assert_eq!(normalize_path(path), "/api/v1/queue/stats");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("figaro_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_queue_metrics() {
        QUEUE_JOINS_TOTAL.inc();
        QUEUE_COMPLETIONS_TOTAL.inc();
        QUEUE_ACTIVE.set(0);
        QUEUE_WAITING.set(0);
        SHOP_OPEN.set(1);

        let output = encode_metrics();
        assert!(output.contains("figaro_queue_joins_total"));
        assert!(output.contains("figaro_queue_completions_total"));
        assert!(output.contains("figaro_queue_active"));
        assert!(output.contains("figaro_shop_open"));
    }
}
