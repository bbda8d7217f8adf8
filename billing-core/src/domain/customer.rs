use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billing customer.
///
/// `loan_id` is exclusive: at most one customer may reference a given
/// loan, and a customer may reference at most one loan at a time. The
/// link lives here, not on the loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub name: HeaplessString<255>,
    pub address: HeaplessString<500>,
    pub is_delinquent: bool,
    pub active: bool,
    pub loan_id: Option<i64>,
    pub create_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// A customer may be deactivated unless it carries a loan that is not
    /// yet paid off.
    pub fn deactivation_blocked_by_loan(&self, linked_loan_status: Option<super::loan::LoanStatus>) -> bool {
        match linked_loan_status {
            Some(super::loan::LoanStatus::PaidOff) | None => false,
            Some(_) => true,
        }
    }
}

/// Input to `CustomerService::create_new_customer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomerRequest {
    pub name: String,
    pub address: String,
}
