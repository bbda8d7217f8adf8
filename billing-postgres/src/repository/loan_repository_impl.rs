use async_trait::async_trait;
use billing_core::error::{BillingError, BillingResult};
use billing_db::models::{LoanModel, ScheduleEntryModel};
use billing_db::repository::{LoanRepository, NewLoan, NewScheduleEntry, Tx};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct LoanRow {
    loan_id: i64,
    principal_amount: Decimal,
    term_weeks: i32,
    annual_interest_rate: Decimal,
    total_amount: Decimal,
    weekly_installment: Decimal,
    start_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LoanRow> for LoanModel {
    fn from(row: LoanRow) -> Self {
        LoanModel {
            loan_id: row.loan_id,
            principal_amount: row.principal_amount,
            term_weeks: row.term_weeks,
            annual_interest_rate: row.annual_interest_rate,
            total_amount: row.total_amount,
            weekly_installment: row.weekly_installment,
            start_date: row.start_date,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleEntryRow {
    schedule_id: Uuid,
    loan_id: i64,
    week_number: i32,
    due_date: NaiveDate,
    due_amount: Decimal,
    paid_amount: Decimal,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ScheduleEntryRow> for ScheduleEntryModel {
    fn from(row: ScheduleEntryRow) -> Self {
        ScheduleEntryModel {
            schedule_id: row.schedule_id,
            loan_id: row.loan_id,
            week_number: row.week_number,
            due_date: row.due_date,
            due_amount: row.due_amount,
            paid_amount: row.paid_amount,
            status: row.status,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const LOAN_COLUMNS: &str = "loan_id, principal_amount, term_weeks, annual_interest_rate, \
     total_amount, weekly_installment, start_date, status, created_at, updated_at";

const SCHEDULE_COLUMNS: &str = "schedule_id, loan_id, week_number, due_date, due_amount, \
     paid_amount, status, paid_at, created_at, updated_at";

/// Persistence for loans, their schedules, and the transactional payment
/// state machine described in §4.2 and §4.4.
pub struct PostgresLoanRepository {
    pool: PgPool,
}

impl PostgresLoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for PostgresLoanRepository {
    async fn begin(&self) -> BillingResult<Tx> {
        self.pool.begin().await.map_err(BillingError::from)
    }

    async fn rollback(&self, tx: Tx) -> BillingResult<()> {
        // A transaction already closed by the server (e.g. after a failed
        // statement) errors here; that is the no-op case spec §4.4 calls
        // out, so it is logged and swallowed rather than propagated.
        if let Err(err) = tx.rollback().await {
            tracing::warn!(error = %err, "transaction rollback was a no-op");
        }
        Ok(())
    }

    async fn commit(&self, tx: Tx) -> BillingResult<()> {
        tx.commit().await.map_err(BillingError::from)
    }

    async fn create_loan(
        &self,
        customer_id: Uuid,
        loan: NewLoan,
        schedule: Vec<NewScheduleEntry>,
    ) -> BillingResult<LoanModel> {
        let mut tx = self.pool.begin().await.map_err(BillingError::from)?;

        let insert_query = format!(
            r#"
            INSERT INTO loans (principal_amount, term_weeks, annual_interest_rate, total_amount,
                                weekly_installment, start_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
            RETURNING {LOAN_COLUMNS}
            "#
        );
        let loan_row: LoanRow = match sqlx::query_as(&insert_query)
            .bind(loan.principal_amount)
            .bind(loan.term_weeks)
            .bind(loan.annual_interest_rate)
            .bind(loan.total_amount)
            .bind(loan.weekly_installment)
            .bind(loan.start_date)
            .bind(&loan.status)
            .fetch_one(&mut *tx)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                let _ = tx.rollback().await;
                return Err(BillingError::from(err));
            }
        };
        let loan_model = LoanModel::from(loan_row);

        // Batch insert the schedule in one round trip: a single multi-row
        // VALUES list rather than one INSERT per week.
        let mut builder = sqlx::QueryBuilder::new(
            "INSERT INTO loan_schedule (loan_id, week_number, due_date, due_amount, paid_amount, status, created_at, updated_at) ",
        );
        builder.push_values(schedule.iter(), |mut b, entry| {
            b.push_bind(loan_model.loan_id)
                .push_bind(entry.week_number)
                .push_bind(entry.due_date)
                .push_bind(entry.due_amount)
                .push_bind(Decimal::ZERO)
                .push_bind("PENDING")
                .push("now()")
                .push("now()");
        });
        if let Err(err) = builder.build().execute(&mut *tx).await {
            let _ = tx.rollback().await;
            return Err(BillingError::from(err));
        }

        let link_result = sqlx::query("UPDATE customers SET loan_id = $2, updated_at = now() WHERE customer_id = $1 AND loan_id IS NULL")
            .bind(customer_id)
            .bind(loan_model.loan_id)
            .execute(&mut *tx)
            .await;
        let rows_affected = match link_result {
            Ok(result) => result.rows_affected(),
            Err(err) => {
                let _ = tx.rollback().await;
                return Err(BillingError::from(err));
            }
        };
        if rows_affected == 0 {
            let _ = tx.rollback().await;
            return Err(BillingError::Conflict(format!(
                "customer {customer_id} already has a linked loan"
            )));
        }

        tx.commit().await.map_err(BillingError::from)?;
        Ok(loan_model)
    }

    async fn get_loan_by_id(&self, loan_id: i64) -> BillingResult<Option<LoanModel>> {
        let query = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE loan_id = $1");
        let row: Option<LoanRow> = sqlx::query_as(&query)
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(BillingError::from)?;
        Ok(row.map(LoanModel::from))
    }

    async fn get_schedule_by_loan_id(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
        let query = format!("SELECT {SCHEDULE_COLUMNS} FROM loan_schedule WHERE loan_id = $1 ORDER BY week_number ASC");
        let rows: Vec<ScheduleEntryRow> = sqlx::query_as(&query)
            .bind(loan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(BillingError::from)?;
        Ok(rows.into_iter().map(ScheduleEntryModel::from).collect())
    }

    async fn get_unpaid_schedules(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
        let query = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM loan_schedule WHERE loan_id = $1 AND status <> 'PAID' ORDER BY due_date ASC"
        );
        let rows: Vec<ScheduleEntryRow> = sqlx::query_as(&query)
            .bind(loan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(BillingError::from)?;
        Ok(rows.into_iter().map(ScheduleEntryModel::from).collect())
    }

    async fn get_last_two_due_unpaid_schedules(
        &self,
        loan_id: i64,
        now: DateTime<Utc>,
    ) -> BillingResult<Vec<ScheduleEntryModel>> {
        let query = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM loan_schedule \
             WHERE loan_id = $1 AND due_date < $2 AND status <> 'PAID' \
             ORDER BY due_date DESC LIMIT 2"
        );
        let rows: Vec<ScheduleEntryRow> = sqlx::query_as(&query)
            .bind(loan_id)
            .bind(now.date_naive())
            .fetch_all(&self.pool)
            .await
            .map_err(BillingError::from)?;
        Ok(rows.into_iter().map(ScheduleEntryModel::from).collect())
    }

    async fn find_oldest_unpaid_entry_for_update(
        &self,
        tx: &mut Tx,
        loan_id: i64,
    ) -> BillingResult<Option<ScheduleEntryModel>> {
        let query = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM loan_schedule \
             WHERE loan_id = $1 AND status = 'PENDING' \
             ORDER BY due_date ASC LIMIT 1 FOR UPDATE"
        );
        let row: Option<ScheduleEntryRow> = sqlx::query_as(&query)
            .bind(loan_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(BillingError::from)?;
        Ok(row.map(ScheduleEntryModel::from))
    }

    async fn update_schedule_entry_in_tx(
        &self,
        tx: &mut Tx,
        schedule_id: Uuid,
        paid_amount: Decimal,
        status: &str,
        paid_at: DateTime<Utc>,
    ) -> BillingResult<()> {
        sqlx::query(
            "UPDATE loan_schedule SET paid_amount = $2, status = $3, paid_at = $4, updated_at = now() \
             WHERE schedule_id = $1",
        )
        .bind(schedule_id)
        .bind(paid_amount)
        .bind(status)
        .bind(paid_at)
        .execute(&mut **tx)
        .await
        .map_err(BillingError::from)?;
        Ok(())
    }

    async fn update_loan_status_in_tx(&self, tx: &mut Tx, loan_id: i64, status: &str) -> BillingResult<()> {
        sqlx::query("UPDATE loans SET status = $2, updated_at = now() WHERE loan_id = $1")
            .bind(loan_id)
            .bind(status)
            .execute(&mut **tx)
            .await
            .map_err(BillingError::from)?;
        Ok(())
    }

    async fn check_if_all_payments_made_in_tx(&self, tx: &mut Tx, loan_id: i64) -> BillingResult<bool> {
        let all_paid: (bool,) = sqlx::query_as(
            "SELECT NOT EXISTS(SELECT 1 FROM loan_schedule WHERE loan_id = $1 AND status <> 'PAID')",
        )
        .bind(loan_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(BillingError::from)?;
        Ok(all_paid.0)
    }

    async fn get_total_outstanding_amount(&self, loan_id: i64) -> BillingResult<Decimal> {
        let (outstanding,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(GREATEST(due_amount - paid_amount, 0)), 0) FROM loan_schedule \
             WHERE loan_id = $1 AND status <> 'PAID'",
        )
        .bind(loan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(BillingError::from)?;
        Ok(outstanding.max(Decimal::ZERO))
    }

    async fn get_all_active_loan_ids(&self) -> BillingResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT loan_id FROM loans WHERE status <> 'PAID_OFF'")
            .fetch_all(&self.pool)
            .await
            .map_err(BillingError::from)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
