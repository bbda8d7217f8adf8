use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::{Loan, LoanWithSchedule, ScheduleEntry},
    error::BillingResult,
};

/// Business rules over loans and payments. See `PaymentStateMachine` in
/// `billing-logic` for the transactional detail behind `make_payment`.
#[async_trait]
pub trait LoanService: Send + Sync {
    /// Requires the customer to exist, be active, and carry no currently
    /// non-paid-off loan. Persists the loan, its schedule, and the
    /// customer-loan link atomically, then emits `CustomerUpdated`.
    async fn create_loan(
        &self,
        customer_id: Uuid,
        principal_amount: Decimal,
        term_weeks: i32,
        annual_interest_rate: Decimal,
        start_date: NaiveDate,
    ) -> BillingResult<Loan>;

    /// Exact-match payment against the oldest pending installment. See
    /// §4.2: succeeds iff `|amount - due_amount| <= 0.001`.
    async fn make_payment(&self, loan_id: i64, amount: Decimal) -> BillingResult<()>;

    /// Sum of `due_amount - paid_amount` over non-paid entries, clamped to
    /// a non-negative value.
    async fn get_outstanding(&self, loan_id: i64) -> BillingResult<Decimal>;

    /// True iff at least two schedule entries are past due and unpaid.
    /// Pure function of schedule state; never reads `Loan.status`.
    async fn is_delinquent(&self, loan_id: i64) -> BillingResult<bool>;

    async fn get_loan(&self, loan_id: i64) -> BillingResult<LoanWithSchedule>;

    async fn get_loan_schedule(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntry>>;
}
