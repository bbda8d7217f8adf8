use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The notify-service read model: a mirror of the billing-side `Customer`
/// minus the uniqueness constraint on `loan_id` (§3). The projection is
/// derived and eventually consistent, so it tolerates the billing side's
/// invariant being momentarily violated by an out-of-order delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyCustomer {
    pub customer_id: Uuid,
    pub name: HeaplessString<255>,
    pub address: HeaplessString<500>,
    pub is_delinquent: bool,
    pub active: bool,
    pub loan_id: Option<i64>,
    pub create_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
