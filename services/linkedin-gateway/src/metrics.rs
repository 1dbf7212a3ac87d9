//! Prometheus metrics exposition
//!
//! - `gateway_requests_total` (counter): labels `method`, `route`, `status`
//! - `gateway_request_duration_seconds` (histogram): label `route`
//! - `gateway_upstream_errors_total` (counter): label `operation`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::AppState;

const DURATION_METRIC: &str = "gateway_request_duration_seconds";

/// 5ms to 60s. Post requests chain up to four LinkedIn calls plus a media
/// download, so the tail is long.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Counters surfaced on `/health`
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed request. `route` is the matched route template, not
/// the raw path, to keep label cardinality bounded.
pub fn record_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route.to_string()).record(duration_secs);
}

/// Record a LinkedIn call that failed or answered with an error status.
pub fn record_upstream_error(operation: &'static str) {
    metrics::counter!("gateway_upstream_errors_total", "operation" => operation).increment(1);
}

/// Middleware counting every request for `/health` and Prometheus.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    record_request(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
