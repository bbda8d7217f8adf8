use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// A single counter: events successfully projected since process start.
/// Deliberately minimal — the notify service has no request surface of
/// its own to instrument beyond this and the health check.
pub struct Metrics {
    registry: Registry,
    pub events_projected_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let events_projected_total = IntCounter::new(
            "notify_events_projected_total",
            "Total domain events successfully projected into the read model",
        )
        .expect("valid counter opts");
        registry
            .register(Box::new(events_projected_total.clone()))
            .expect("register events_projected_total");
        Self { registry, events_projected_total }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metrics.registry.gather(), &mut buffer).expect("encode metrics");
    ([("content-type", "text/plain; version=0.0.4")], buffer)
}

pub fn build_router(metrics: Arc<Metrics>, metrics_path: &str) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route(metrics_path, get(metrics_handler))
        .with_state(metrics)
}
