use async_trait::async_trait;

use crate::domain::NotifyCustomer;
use crate::error::NotifyResult;

/// The notify service's single write path (§4.8): an idempotent,
/// last-writer-wins upsert keyed on the event's `updated_at`.
///
/// Implementations must treat `upsert` as safe to call twice with the
/// same snapshot (replay) and must silently drop a snapshot whose
/// `updated_at` is older than the row already on disk.
#[async_trait]
pub trait CustomerProjection: Send + Sync {
    async fn upsert(&self, customer: NotifyCustomer) -> NotifyResult<()>;

    async fn find_by_id(&self, customer_id: uuid::Uuid) -> NotifyResult<Option<NotifyCustomer>>;

    async fn list_active(&self) -> NotifyResult<Vec<NotifyCustomer>>;

    async fn list_delinquent(&self) -> NotifyResult<Vec<NotifyCustomer>>;
}
