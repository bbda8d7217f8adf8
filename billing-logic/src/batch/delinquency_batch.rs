use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use billing_core::{
    error::{BillingError, BillingResult},
    service::{CustomerService, LoanService},
};
use billing_db::repository::LoanRepository;
use chrono::Utc;
use cron::Schedule;
use tokio::sync::watch;

/// Outcome of a single pass over every active loan (spec §4.5).
///
/// `failed` counts loans whose individual reconciliation errored; per the
/// redesign flag in §9, those errors are logged and skipped rather than
/// aborting the run. Only a failure of the initial `get_all_active_loan_ids`
/// fetch fails the run as a whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunReport {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Periodic reconciliation of `Customer.is_delinquent` against the
/// loan-local delinquency view (§4.3).
pub struct DelinquencyBatch {
    loan_repository: Arc<dyn LoanRepository>,
    loan_service: Arc<dyn LoanService>,
    customer_service: Arc<dyn CustomerService>,
}

impl DelinquencyBatch {
    pub fn new(
        loan_repository: Arc<dyn LoanRepository>,
        loan_service: Arc<dyn LoanService>,
        customer_service: Arc<dyn CustomerService>,
    ) -> Self {
        Self {
            loan_repository,
            loan_service,
            customer_service,
        }
    }

    /// One pass: fetch every active loan id, recompute delinquency for
    /// each, and push an update through `CustomerService` when the
    /// materialized flag disagrees. Sequential by design; the fan-out
    /// permitted by §4.5 is left to the caller, since mutations land on
    /// distinct customers and are independent either way.
    pub async fn run_once(&self) -> BillingResult<BatchRunReport> {
        let loan_ids = self.loan_repository.get_all_active_loan_ids().await?;
        let mut report = BatchRunReport {
            scanned: loan_ids.len(),
            ..Default::default()
        };

        for loan_id in loan_ids {
            match self.reconcile_one(loan_id).await {
                Ok(true) => report.updated += 1,
                Ok(false) => {}
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(loan_id, error = %err, "delinquency batch failed to reconcile loan");
                }
            }
        }

        Ok(report)
    }

    async fn reconcile_one(&self, loan_id: i64) -> BillingResult<bool> {
        let delinquent = self.loan_service.is_delinquent(loan_id).await?;
        let customer = self.customer_service.find_customer_by_loan(loan_id).await?;

        if customer.is_delinquent != delinquent {
            self.customer_service
                .update_delinquency(customer.customer_id, delinquent)
                .await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Fires `run_once` on every `cron_expr` match, bounding each run with
    /// `timeout`, until `shutdown` signals true. Never overlaps
    /// invocations: a run that outlasts the next scheduled fire simply
    /// delays it, matching the single-run-at-a-time guarantee in §5.
    pub async fn run_scheduled(
        self: Arc<Self>,
        cron_expr: &str,
        timeout: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> BillingResult<()> {
        let schedule = Schedule::from_str(cron_expr).map_err(|err| BillingError::Validation {
            field: "batch.cron".to_string(),
            message: err.to_string(),
        })?;

        loop {
            let Some(next_fire) = schedule.upcoming(Utc).next() else {
                return Ok(());
            };
            let delay = (next_fire - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
            if *shutdown.borrow() {
                return Ok(());
            }

            match tokio::time::timeout(timeout, self.run_once()).await {
                Ok(Ok(report)) => tracing::info!(
                    scanned = report.scanned,
                    updated = report.updated,
                    failed = report.failed,
                    "delinquency batch run complete"
                ),
                Ok(Err(err)) => tracing::error!(error = %err, "delinquency batch run failed"),
                Err(_) => tracing::error!(
                    timeout_secs = timeout.as_secs(),
                    "delinquency batch run exceeded its configured timeout"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billing_core::domain::{Customer, Loan, LoanWithSchedule, ScheduleEntry};
    use billing_core::error::BillingError;
    use billing_db::models::{LoanModel, ScheduleEntryModel};
    use billing_db::repository::{NewLoan, NewScheduleEntry, Tx};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Stub satisfying `LoanRepository` so the batch can fetch the active
    /// loan-id list; every other method is unreachable from `run_once`.
    struct StubLoanRepository {
        active_ids: Vec<i64>,
    }

    #[async_trait]
    impl LoanRepository for StubLoanRepository {
        async fn begin(&self) -> BillingResult<Tx> {
            unimplemented!()
        }
        async fn rollback(&self, _tx: Tx) -> BillingResult<()> {
            unimplemented!()
        }
        async fn commit(&self, _tx: Tx) -> BillingResult<()> {
            unimplemented!()
        }
        async fn create_loan(
            &self,
            _customer_id: Uuid,
            _loan: NewLoan,
            _schedule: Vec<NewScheduleEntry>,
        ) -> BillingResult<LoanModel> {
            unimplemented!()
        }
        async fn get_loan_by_id(&self, _loan_id: i64) -> BillingResult<Option<LoanModel>> {
            unimplemented!()
        }
        async fn get_schedule_by_loan_id(&self, _loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
            unimplemented!()
        }
        async fn get_unpaid_schedules(&self, _loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
            unimplemented!()
        }
        async fn get_last_two_due_unpaid_schedules(
            &self,
            _loan_id: i64,
            _now: chrono::DateTime<Utc>,
        ) -> BillingResult<Vec<ScheduleEntryModel>> {
            unimplemented!()
        }
        async fn find_oldest_unpaid_entry_for_update(
            &self,
            _tx: &mut Tx,
            _loan_id: i64,
        ) -> BillingResult<Option<ScheduleEntryModel>> {
            unimplemented!()
        }
        async fn update_schedule_entry_in_tx(
            &self,
            _tx: &mut Tx,
            _schedule_id: Uuid,
            _paid_amount: Decimal,
            _status: &str,
            _paid_at: chrono::DateTime<Utc>,
        ) -> BillingResult<()> {
            unimplemented!()
        }
        async fn update_loan_status_in_tx(&self, _tx: &mut Tx, _loan_id: i64, _status: &str) -> BillingResult<()> {
            unimplemented!()
        }
        async fn check_if_all_payments_made_in_tx(&self, _tx: &mut Tx, _loan_id: i64) -> BillingResult<bool> {
            unimplemented!()
        }
        async fn get_total_outstanding_amount(&self, _loan_id: i64) -> BillingResult<Decimal> {
            unimplemented!()
        }
        async fn get_all_active_loan_ids(&self) -> BillingResult<Vec<i64>> {
            Ok(self.active_ids.clone())
        }
    }

    /// Fake `LoanService` whose `is_delinquent` answers are pre-programmed
    /// per loan id, and whose every other method is unreachable.
    struct FakeLoanService {
        delinquent: HashMap<i64, bool>,
        fail: Vec<i64>,
    }

    #[async_trait]
    impl LoanService for FakeLoanService {
        async fn create_loan(
            &self,
            _customer_id: Uuid,
            _principal_amount: Decimal,
            _term_weeks: i32,
            _annual_interest_rate: Decimal,
            _start_date: chrono::NaiveDate,
        ) -> BillingResult<Loan> {
            unimplemented!()
        }
        async fn make_payment(&self, _loan_id: i64, _amount: Decimal) -> BillingResult<()> {
            unimplemented!()
        }
        async fn get_outstanding(&self, _loan_id: i64) -> BillingResult<Decimal> {
            unimplemented!()
        }
        async fn is_delinquent(&self, loan_id: i64) -> BillingResult<bool> {
            if self.fail.contains(&loan_id) {
                return Err(BillingError::Internal("boom".to_string()));
            }
            Ok(*self.delinquent.get(&loan_id).unwrap_or(&false))
        }
        async fn get_loan(&self, _loan_id: i64) -> BillingResult<LoanWithSchedule> {
            unimplemented!()
        }
        async fn get_loan_schedule(&self, _loan_id: i64) -> BillingResult<Vec<ScheduleEntry>> {
            unimplemented!()
        }
    }

    /// Fake `CustomerService` backed by a loan_id -> customer map; records
    /// every `update_delinquency` call it receives.
    #[derive(Default)]
    struct FakeCustomerService {
        by_loan: HashMap<i64, Customer>,
        updates: Mutex<Vec<(Uuid, bool)>>,
    }

    #[async_trait]
    impl CustomerService for FakeCustomerService {
        async fn create_new_customer(&self, _name: &str, _address: &str) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn get_customer(&self, _customer_id: Uuid) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn list_active_customers(&self) -> BillingResult<Vec<Customer>> {
            unimplemented!()
        }
        async fn update_customer_address(&self, _customer_id: Uuid, _address: &str) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn assign_loan_to_customer(&self, _customer_id: Uuid, _loan_id: i64) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn update_delinquency(&self, customer_id: Uuid, is_delinquent: bool) -> BillingResult<Customer> {
            self.updates.lock().unwrap().push((customer_id, is_delinquent));
            let mut customer = self
                .by_loan
                .values()
                .find(|c| c.customer_id == customer_id)
                .cloned()
                .unwrap();
            customer.is_delinquent = is_delinquent;
            Ok(customer)
        }
        async fn deactivate_customer(&self, _customer_id: Uuid) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn reactivate_customer(&self, _customer_id: Uuid) -> BillingResult<Customer> {
            unimplemented!()
        }
        async fn find_customer_by_loan(&self, loan_id: i64) -> BillingResult<Customer> {
            self.by_loan
                .get(&loan_id)
                .cloned()
                .ok_or_else(|| BillingError::NotFound(format!("customer for loan {loan_id}")))
        }
    }

    fn customer(loan_id: i64, is_delinquent: bool) -> Customer {
        let now = chrono::Utc::now();
        Customer {
            customer_id: Uuid::new_v4(),
            name: heapless::String::try_from("Alice").unwrap(),
            address: heapless::String::try_from("1 Main").unwrap(),
            is_delinquent,
            active: true,
            loan_id: Some(loan_id),
            create_date: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn run_once_updates_only_customers_whose_flag_disagrees() {
        let alice = customer(1, false);
        let bob = customer(2, true);
        let alice_id = alice.customer_id;
        let fake_customers = Arc::new(FakeCustomerService {
            by_loan: HashMap::from([(1, alice), (2, bob)]),
            updates: Mutex::new(vec![]),
        });

        let batch = DelinquencyBatch::new(
            Arc::new(StubLoanRepository { active_ids: vec![1, 2] }),
            Arc::new(FakeLoanService {
                delinquent: HashMap::from([(1, true), (2, true)]),
                fail: vec![],
            }),
            fake_customers.clone(),
        );

        let report = batch.run_once().await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(*fake_customers.updates.lock().unwrap(), vec![(alice_id, true)]);
    }

    #[tokio::test]
    async fn run_once_continues_past_a_per_loan_failure() {
        let alice = customer(1, false);
        let bob = customer(2, true);

        let fake_customers = Arc::new(FakeCustomerService {
            by_loan: HashMap::from([(1, alice), (2, bob)]),
            updates: Mutex::new(vec![]),
        });

        let batch = DelinquencyBatch::new(
            Arc::new(StubLoanRepository {
                active_ids: vec![1, 2, 3],
            }),
            Arc::new(FakeLoanService {
                delinquent: HashMap::from([(1, true)]),
                fail: vec![3],
            }),
            fake_customers.clone(),
        );

        let report = batch.run_once().await.unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(fake_customers.updates.lock().unwrap().len(), 1);
    }
}
