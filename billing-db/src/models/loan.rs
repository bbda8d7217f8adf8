use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row shape of the `loans` table. `status` is persisted as text and
/// parsed via [`crate::models::parse_loan_status`]. Carries no reference
/// to its customer: that link lives only on the `customers` row (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanModel {
    pub loan_id: i64,
    pub principal_amount: Decimal,
    pub term_weeks: i32,
    pub annual_interest_rate: Decimal,
    pub total_amount: Decimal,
    pub weekly_installment: Decimal,
    pub start_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `loan_schedule` table. `status` is persisted as
/// text and parsed via [`crate::models::parse_schedule_entry_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntryModel {
    pub schedule_id: Uuid,
    pub loan_id: i64,
    pub week_number: i32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
