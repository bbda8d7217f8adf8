use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::state::SharedState;

/// Request-scoped counters and latency histogram, registered once at
/// startup and scraped at `metrics.path` (default `/metrics`).
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("billing_http_requests_total", "Total HTTP requests handled"),
            &["method", "path", "status"],
        )
        .expect("valid counter opts");

        let request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "billing_http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "path"],
        )
        .expect("valid histogram opts");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("register requests_total");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("register request_duration_seconds");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
        }
    }

    fn gather(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode(&families, &mut buffer).expect("encode metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records count and latency for every request that reaches the router.
pub async fn track_metrics(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    state
        .metrics
        .requests_total
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();
    state
        .metrics
        .request_duration_seconds
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    response
}

pub async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let body = state.metrics.gather();
    ([("content-type", "text/plain; version=0.0.4")], body)
}
