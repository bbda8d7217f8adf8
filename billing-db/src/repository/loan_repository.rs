use async_trait::async_trait;
use billing_core::BillingResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Postgres;
use uuid::Uuid;

use crate::models::{LoanModel, ScheduleEntryModel};

/// A live database transaction. Exposed directly rather than behind an
/// opaque handle: every caller of the `*InTx` methods below already holds
/// one from `begin`, and threading the concrete sqlx type keeps the row
/// lock in §4.2 auditable at the call site instead of hidden behind an
/// adapter.
pub type Tx = sqlx::Transaction<'static, Postgres>;

#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn begin(&self) -> BillingResult<Tx>;

    /// No-op if `tx` has already been committed or rolled back.
    async fn rollback(&self, tx: Tx) -> BillingResult<()>;

    async fn commit(&self, tx: Tx) -> BillingResult<()>;

    /// Inserts the loan, batch-inserts its schedule, and links the
    /// customer in one transaction. The `loan_id IS NULL` guard on the
    /// customer update is the conflict check; 0 rows affected surfaces
    /// as `BillingError::Conflict` to the caller, which rolls back.
    async fn create_loan(
        &self,
        customer_id: Uuid,
        loan: NewLoan,
        schedule: Vec<NewScheduleEntry>,
    ) -> BillingResult<LoanModel>;

    async fn get_loan_by_id(&self, loan_id: i64) -> BillingResult<Option<LoanModel>>;

    /// Ordered by `week_number` ascending.
    async fn get_schedule_by_loan_id(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>>;

    /// Ordered by `due_date` ascending.
    async fn get_unpaid_schedules(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>>;

    /// Entries with `due_date < now`, `status <> PAID`, newest-due first, limit 2.
    async fn get_last_two_due_unpaid_schedules(
        &self,
        loan_id: i64,
        now: DateTime<Utc>,
    ) -> BillingResult<Vec<ScheduleEntryModel>>;

    /// `SELECT … WHERE loan_id=? AND status='PENDING' ORDER BY due_date ASC LIMIT 1 FOR UPDATE`.
    async fn find_oldest_unpaid_entry_for_update(
        &self,
        tx: &mut Tx,
        loan_id: i64,
    ) -> BillingResult<Option<ScheduleEntryModel>>;

    async fn update_schedule_entry_in_tx(
        &self,
        tx: &mut Tx,
        schedule_id: Uuid,
        paid_amount: Decimal,
        status: &str,
        paid_at: DateTime<Utc>,
    ) -> BillingResult<()>;

    async fn update_loan_status_in_tx(&self, tx: &mut Tx, loan_id: i64, status: &str) -> BillingResult<()>;

    /// True iff no schedule entry for this loan has `status <> PAID`.
    async fn check_if_all_payments_made_in_tx(&self, tx: &mut Tx, loan_id: i64) -> BillingResult<bool>;

    /// `sum(due_amount - paid_amount)` over non-PAID entries, clamped at 0.
    async fn get_total_outstanding_amount(&self, loan_id: i64) -> BillingResult<Decimal>;

    /// All loan ids whose status is not `PAID_OFF`, for the delinquency batch.
    async fn get_all_active_loan_ids(&self) -> BillingResult<Vec<i64>>;
}

/// Input to [`LoanRepository::create_loan`]; mirrors the persisted loan
/// row minus the assigned id.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub principal_amount: Decimal,
    pub term_weeks: i32,
    pub annual_interest_rate: Decimal,
    pub total_amount: Decimal,
    pub weekly_installment: Decimal,
    pub start_date: chrono::NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NewScheduleEntry {
    pub week_number: i32,
    pub due_date: chrono::NaiveDate,
    pub due_amount: Decimal,
}
