use async_trait::async_trait;

use crate::{domain::DomainEvent, error::BillingResult};

/// Publishes domain events to the topic exchange described in spec §4.7.
///
/// Implementations own their own retry policy; `publish` returning `Err`
/// means "gave up", not "never tried". Callers (the services) log and
/// swallow publish failures rather than fail the originating mutation —
/// at-least-once delivery on the database side, best-effort on the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> BillingResult<()>;
}

/// A publisher that drops every event. Used in tests for services that
/// require an `EventPublisher` but don't exercise publication.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: DomainEvent) -> BillingResult<()> {
        Ok(())
    }
}
