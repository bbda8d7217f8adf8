use std::sync::Arc;

use async_trait::async_trait;
use billing_amqp::{AmqpError, EventHandler};
use billing_core::domain::DomainEvent;
use notify_core::projection::CustomerProjection;

use crate::mapper::to_notify_customer;
use crate::metrics::Metrics;

/// Bridges the generic AMQP consumer to the notify-side projection.
/// Every event variant carries a full customer snapshot, so every variant
/// maps to the same `upsert` call (§4.8) — only the log line differs.
pub struct ProjectionEventHandler {
    projection: Arc<dyn CustomerProjection>,
    metrics: Arc<Metrics>,
}

impl ProjectionEventHandler {
    pub fn new(projection: Arc<dyn CustomerProjection>, metrics: Arc<Metrics>) -> Self {
        Self { projection, metrics }
    }
}

#[async_trait]
impl EventHandler for ProjectionEventHandler {
    async fn handle(&self, event: DomainEvent) -> Result<(), AmqpError> {
        let customer_id = event.customer_id();
        let payload = match event {
            DomainEvent::CustomerCreated { payload } => payload,
            DomainEvent::CustomerUpdated { payload } => payload,
            DomainEvent::CustomerDelinquencyChanged { payload, .. } => payload,
        };

        let customer = to_notify_customer(payload)?;

        self.projection
            .upsert(customer)
            .await
            .map_err(|err| AmqpError::Handler(err.to_string()))?;

        self.metrics.events_projected_total.inc();
        tracing::debug!(%customer_id, "projected customer snapshot");
        Ok(())
    }
}
