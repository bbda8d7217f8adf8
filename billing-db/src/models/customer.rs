use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row shape of the `customers` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerModel {
    pub customer_id: Uuid,
    pub name: HeaplessString<255>,
    pub address: HeaplessString<500>,
    pub is_delinquent: bool,
    pub active: bool,
    pub loan_id: Option<i64>,
    pub create_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
