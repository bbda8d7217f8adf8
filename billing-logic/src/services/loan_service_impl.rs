use std::sync::Arc;

use async_trait::async_trait;
use billing_core::{
    domain::{
        compute_loan_amounts, generate_schedule, CustomerEventPayload, DomainEvent, Loan, LoanStatus,
        LoanWithSchedule, ScheduleEntry, ScheduleEntryStatus,
    },
    error::{BillingError, BillingResult},
    service::{EventPublisher, LoanService},
};
use billing_db::{
    repository::{CustomerRepository, LoanRepository, NewLoan, NewScheduleEntry},
    Tx,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::mappers::{CustomerMapper, LoanMapper};

/// Tolerance the payment state machine allows between a payment and the
/// installment it is meant to settle.
const PAYMENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

pub struct LoanServiceImpl {
    loan_repository: Arc<dyn LoanRepository>,
    customer_repository: Arc<dyn CustomerRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl LoanServiceImpl {
    pub fn new(
        loan_repository: Arc<dyn LoanRepository>,
        customer_repository: Arc<dyn CustomerRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            loan_repository,
            customer_repository,
            publisher,
        }
    }

    async fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err, "failed to publish domain event");
        }
    }

    /// Rolls `tx` back and returns `err`, logging rollback failure without
    /// masking the original error.
    async fn abort(&self, tx: Tx, err: BillingError) -> BillingError {
        if let Err(rollback_err) = self.loan_repository.rollback(tx).await {
            tracing::error!(error = %rollback_err, "failed to roll back transaction");
        }
        err
    }
}

#[async_trait]
impl LoanService for LoanServiceImpl {
    async fn create_loan(
        &self,
        customer_id: Uuid,
        principal_amount: Decimal,
        term_weeks: i32,
        annual_interest_rate: Decimal,
        start_date: NaiveDate,
    ) -> BillingResult<Loan> {
        if principal_amount <= Decimal::ZERO {
            return Err(BillingError::Validation {
                field: "principal_amount".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if term_weeks <= 0 {
            return Err(BillingError::Validation {
                field: "term_weeks".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if annual_interest_rate < Decimal::ZERO {
            return Err(BillingError::Validation {
                field: "annual_interest_rate".to_string(),
                message: "must not be negative".to_string(),
            });
        }

        let customer = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        if !customer.active {
            return Err(BillingError::Validation {
                field: "customer_id".to_string(),
                message: "customer is not active".to_string(),
            });
        }

        if let Some(existing_loan_id) = customer.loan_id {
            let existing = self.loan_repository.get_loan_by_id(existing_loan_id).await?;
            let still_open = match existing {
                Some(loan) => {
                    billing_db::models::parse_loan_status(&loan.status)
                        .map_err(|e| BillingError::Internal(format!("corrupt loan status: {e}")))?
                        != LoanStatus::PaidOff
                }
                None => false,
            };
            if still_open {
                return Err(BillingError::CustomerAlreadyHasLoan(customer_id));
            }
        }

        let (total_amount, weekly_installment) =
            compute_loan_amounts(principal_amount, annual_interest_rate, term_weeks);
        let draft_schedule = generate_schedule(total_amount, term_weeks, weekly_installment, start_date);

        let new_loan = NewLoan {
            principal_amount,
            term_weeks,
            annual_interest_rate,
            total_amount,
            weekly_installment,
            start_date,
            status: LoanStatus::Active.to_string(),
        };
        let new_schedule = draft_schedule
            .into_iter()
            .map(|d| NewScheduleEntry {
                week_number: d.week_number,
                due_date: d.due_date,
                due_amount: d.due_amount,
            })
            .collect();

        let loan_model = self
            .loan_repository
            .create_loan(customer_id, new_loan, new_schedule)
            .await?;
        let loan = LoanMapper::loan_from_model(loan_model)
            .map_err(|e| BillingError::Internal(format!("corrupt loan row: {e}")))?;

        let updated_customer = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .map(CustomerMapper::from_model);
        if let Some(customer) = updated_customer {
            self.publish(DomainEvent::CustomerUpdated {
                payload: CustomerEventPayload::from(&customer),
            })
            .await;
        }

        Ok(loan)
    }

    async fn make_payment(&self, loan_id: i64, amount: Decimal) -> BillingResult<()> {
        if amount <= Decimal::ZERO {
            return Err(BillingError::Validation {
                field: "amount".to_string(),
                message: "must be positive".to_string(),
            });
        }

        let mut tx = self.loan_repository.begin().await?;

        let entry = match self
            .loan_repository
            .find_oldest_unpaid_entry_for_update(&mut tx, loan_id)
            .await
        {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                // No pending entry: either the loan is fully paid, or it
                // never existed at all (spec §4.2 step 2).
                let loan_exists = match self.loan_repository.get_loan_by_id(loan_id).await {
                    Ok(loan) => loan.is_some(),
                    Err(err) => return Err(self.abort(tx, err).await),
                };
                let err = if loan_exists {
                    BillingError::LoanFullyPaid(loan_id)
                } else {
                    BillingError::NotFound(format!("loan {loan_id}"))
                };
                return Err(self.abort(tx, err).await);
            }
            Err(err) => return Err(self.abort(tx, err).await),
        };

        if (amount - entry.due_amount).abs() > PAYMENT_TOLERANCE {
            return Err(self.abort(tx, BillingError::InvalidPaymentAmount).await);
        }

        let now = chrono::Utc::now();
        if let Err(err) = self
            .loan_repository
            .update_schedule_entry_in_tx(
                &mut tx,
                entry.schedule_id,
                entry.due_amount,
                &ScheduleEntryStatus::Paid.to_string(),
                now,
            )
            .await
        {
            return Err(self.abort(tx, err).await);
        }

        let all_paid = match self
            .loan_repository
            .check_if_all_payments_made_in_tx(&mut tx, loan_id)
            .await
        {
            Ok(all_paid) => all_paid,
            Err(err) => return Err(self.abort(tx, err).await),
        };

        if all_paid {
            if let Err(err) = self
                .loan_repository
                .update_loan_status_in_tx(&mut tx, loan_id, &LoanStatus::PaidOff.to_string())
                .await
            {
                return Err(self.abort(tx, err).await);
            }
        }

        self.loan_repository.commit(tx).await?;
        Ok(())
    }

    async fn get_outstanding(&self, loan_id: i64) -> BillingResult<Decimal> {
        self.loan_repository
            .get_loan_by_id(loan_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("loan {loan_id}")))?;
        self.loan_repository.get_total_outstanding_amount(loan_id).await
    }

    async fn is_delinquent(&self, loan_id: i64) -> BillingResult<bool> {
        self.loan_repository
            .get_loan_by_id(loan_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("loan {loan_id}")))?;

        let now = chrono::Utc::now();
        let entries = self
            .loan_repository
            .get_last_two_due_unpaid_schedules(loan_id, now)
            .await?;
        Ok(entries.len() >= 2)
    }

    async fn get_loan(&self, loan_id: i64) -> BillingResult<LoanWithSchedule> {
        let loan_model = self
            .loan_repository
            .get_loan_by_id(loan_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("loan {loan_id}")))?;
        let loan = LoanMapper::loan_from_model(loan_model)
            .map_err(|e| BillingError::Internal(format!("corrupt loan row: {e}")))?;

        let schedule = self.get_loan_schedule(loan_id).await?;

        Ok(LoanWithSchedule { loan, schedule })
    }

    async fn get_loan_schedule(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntry>> {
        let models = self.loan_repository.get_schedule_by_loan_id(loan_id).await?;
        models
            .into_iter()
            .map(LoanMapper::schedule_entry_from_model)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BillingError::Internal(format!("corrupt schedule row: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_core::service::NoopEventPublisher;
    use billing_db::models::{CustomerModel, LoanModel, ScheduleEntryModel};
    use billing_db::repository::NewLoan;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// In-memory stand-in for the Postgres-backed loan repository. The
    /// `*_in_tx` methods require a live `sqlx::Transaction` this mock can't
    /// manufacture, so `begin` always errors out before they'd be reached;
    /// `make_payment` is exercised against the real repository instead.
    #[derive(Default)]
    struct MockLoanRepository {
        loans: Mutex<Vec<LoanModel>>,
        schedules: Mutex<Vec<ScheduleEntryModel>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl LoanRepository for MockLoanRepository {
        async fn begin(&self) -> BillingResult<Tx> {
            Err(BillingError::Internal("transactions unavailable in mock".to_string()))
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
            loan: NewLoan,
            schedule: Vec<NewScheduleEntry>,
        ) -> BillingResult<LoanModel> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let loan_id = *next_id;
            let now = chrono::Utc::now();

            let model = LoanModel {
                loan_id,
                principal_amount: loan.principal_amount,
                term_weeks: loan.term_weeks,
                annual_interest_rate: loan.annual_interest_rate,
                total_amount: loan.total_amount,
                weekly_installment: loan.weekly_installment,
                start_date: loan.start_date,
                status: loan.status,
                created_at: now,
                updated_at: now,
            };
            self.loans.lock().unwrap().push(model.clone());

            let mut schedules = self.schedules.lock().unwrap();
            for entry in schedule {
                schedules.push(ScheduleEntryModel {
                    schedule_id: Uuid::new_v4(),
                    loan_id,
                    week_number: entry.week_number,
                    due_date: entry.due_date,
                    due_amount: entry.due_amount,
                    paid_amount: Decimal::ZERO,
                    status: ScheduleEntryStatus::Pending.to_string(),
                    paid_at: None,
                    created_at: now,
                    updated_at: now,
                });
            }

            Ok(model)
        }

        async fn get_loan_by_id(&self, loan_id: i64) -> BillingResult<Option<LoanModel>> {
            Ok(self.loans.lock().unwrap().iter().find(|l| l.loan_id == loan_id).cloned())
        }

        async fn get_schedule_by_loan_id(&self, loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
            let mut entries: Vec<_> = self
                .schedules
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.loan_id == loan_id)
                .cloned()
                .collect();
            entries.sort_by_key(|e| e.week_number);
            Ok(entries)
        }

        async fn get_unpaid_schedules(&self, _loan_id: i64) -> BillingResult<Vec<ScheduleEntryModel>> {
            unimplemented!()
        }

        async fn get_last_two_due_unpaid_schedules(
            &self,
            loan_id: i64,
            now: chrono::DateTime<Utc>,
        ) -> BillingResult<Vec<ScheduleEntryModel>> {
            let mut entries: Vec<_> = self
                .schedules
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    e.loan_id == loan_id
                        && e.status != ScheduleEntryStatus::Paid.to_string()
                        && e.due_date < now.date_naive()
                })
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.due_date.cmp(&a.due_date));
            entries.truncate(2);
            Ok(entries)
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

        async fn get_total_outstanding_amount(&self, loan_id: i64) -> BillingResult<Decimal> {
            let sum: Decimal = self
                .schedules
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.loan_id == loan_id && e.status != ScheduleEntryStatus::Paid.to_string())
                .map(|e| e.due_amount - e.paid_amount)
                .sum();
            Ok(sum.max(Decimal::ZERO))
        }

        async fn get_all_active_loan_ids(&self) -> BillingResult<Vec<i64>> {
            Ok(self
                .loans
                .lock()
                .unwrap()
                .iter()
                .filter(|l| l.status != LoanStatus::PaidOff.to_string())
                .map(|l| l.loan_id)
                .collect())
        }
    }

    #[derive(Default)]
    struct MockCustomerRepository {
        customers: Mutex<Vec<CustomerModel>>,
    }

    impl MockCustomerRepository {
        fn seed(customer: CustomerModel) -> Self {
            Self {
                customers: Mutex::new(vec![customer]),
            }
        }
    }

    #[async_trait]
    impl CustomerRepository for MockCustomerRepository {
        async fn create(&self, _customer: CustomerModel) -> BillingResult<CustomerModel> {
            unimplemented!()
        }

        async fn find_by_id(&self, customer_id: Uuid) -> BillingResult<Option<CustomerModel>> {
            Ok(self
                .customers
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.customer_id == customer_id)
                .cloned())
        }

        async fn find_by_loan_id(&self, _loan_id: i64) -> BillingResult<Option<CustomerModel>> {
            unimplemented!()
        }

        async fn list_active(&self) -> BillingResult<Vec<CustomerModel>> {
            unimplemented!()
        }

        async fn update_address(&self, _customer_id: Uuid, _address: &str) -> BillingResult<CustomerModel> {
            unimplemented!()
        }

        async fn assign_loan(&self, customer_id: Uuid, loan_id: i64) -> BillingResult<bool> {
            let mut customers = self.customers.lock().unwrap();
            let customer = customers.iter_mut().find(|c| c.customer_id == customer_id).unwrap();
            if customer.loan_id.is_some() {
                return Ok(false);
            }
            customer.loan_id = Some(loan_id);
            Ok(true)
        }

        async fn update_delinquency(&self, _customer_id: Uuid, _is_delinquent: bool) -> BillingResult<CustomerModel> {
            unimplemented!()
        }

        async fn set_active(&self, _customer_id: Uuid, _active: bool) -> BillingResult<CustomerModel> {
            unimplemented!()
        }
    }

    fn active_customer(customer_id: Uuid) -> CustomerModel {
        let now = chrono::Utc::now();
        CustomerModel {
            customer_id,
            name: heapless::String::try_from("Alice").unwrap(),
            address: heapless::String::try_from("1 Main").unwrap(),
            is_delinquent: false,
            active: true,
            loan_id: None,
            create_date: now,
            updated_at: now,
        }
    }

    fn service_with(
        loan_repository: MockLoanRepository,
        customer_repository: MockCustomerRepository,
    ) -> LoanServiceImpl {
        LoanServiceImpl::new(
            Arc::new(loan_repository),
            Arc::new(customer_repository),
            Arc::new(NoopEventPublisher),
        )
    }

    #[tokio::test]
    async fn create_loan_produces_the_happy_path_numbers() {
        let customer_id = Uuid::new_v4();
        let service = service_with(
            MockLoanRepository::default(),
            MockCustomerRepository::seed(active_customer(customer_id)),
        );

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let loan = service
            .create_loan(customer_id, dec!(5000000), 50, dec!(0.10), start)
            .await
            .unwrap();

        assert_eq!(loan.total_loan_amount, dec!(5500000.00));
        assert_eq!(loan.weekly_payment_amount, dec!(110000.00));
        assert_eq!(loan.status, LoanStatus::Active);

        let schedule = service.get_loan_schedule(loan.id).await.unwrap();
        assert_eq!(schedule.len(), 50);
        assert_eq!(schedule[0].due_date, start + chrono::Duration::days(7));

        let outstanding = service.get_outstanding(loan.id).await.unwrap();
        assert_eq!(outstanding, dec!(5500000.00));
    }

    #[tokio::test]
    async fn create_loan_rejects_a_non_positive_principal() {
        let customer_id = Uuid::new_v4();
        let service = service_with(
            MockLoanRepository::default(),
            MockCustomerRepository::seed(active_customer(customer_id)),
        );

        let err = service
            .create_loan(
                customer_id,
                dec!(0),
                50,
                dec!(0.10),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation { field, .. } if field == "principal_amount"));
    }

    #[tokio::test]
    async fn create_loan_rejects_a_second_loan_while_the_first_is_open() {
        let customer_id = Uuid::new_v4();
        let loan_repository = MockLoanRepository::default();
        let customer_repository = MockCustomerRepository::seed(active_customer(customer_id));
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        // Build the first loan directly through the repository pair so the
        // customer's `loan_id` link is populated the same way the service
        // would leave it.
        let (total, weekly) = compute_loan_amounts(dec!(5000000), dec!(0.10), 50);
        let schedule = generate_schedule(total, 50, weekly, start)
            .into_iter()
            .map(|d| NewScheduleEntry {
                week_number: d.week_number,
                due_date: d.due_date,
                due_amount: d.due_amount,
            })
            .collect();
        let first = loan_repository
            .create_loan(
                customer_id,
                NewLoan {
                    principal_amount: dec!(5000000),
                    term_weeks: 50,
                    annual_interest_rate: dec!(0.10),
                    total_amount: total,
                    weekly_installment: weekly,
                    start_date: start,
                    status: LoanStatus::Active.to_string(),
                },
                schedule,
            )
            .await
            .unwrap();
        customer_repository.assign_loan(customer_id, first.loan_id).await.unwrap();

        let service = service_with(loan_repository, customer_repository);
        let err = service
            .create_loan(customer_id, dec!(1000), 10, dec!(0.05), start)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::CustomerAlreadyHasLoan(id) if id == customer_id));
    }

    #[tokio::test]
    async fn is_delinquent_requires_at_least_two_past_due_unpaid_entries() {
        let customer_id = Uuid::new_v4();
        let loan_repository = MockLoanRepository::default();
        let now = chrono::Utc::now();
        let loan_id = {
            let loan = loan_repository
                .create_loan(
                    customer_id,
                    NewLoan {
                        principal_amount: dec!(1000),
                        term_weeks: 4,
                        annual_interest_rate: dec!(0.0),
                        total_amount: dec!(1000),
                        weekly_installment: dec!(250),
                        start_date: (now - chrono::Duration::days(40)).date_naive(),
                        status: LoanStatus::Active.to_string(),
                    },
                    vec![
                        NewScheduleEntry {
                            week_number: 1,
                            due_date: (now - chrono::Duration::days(30)).date_naive(),
                            due_amount: dec!(250),
                        },
                        NewScheduleEntry {
                            week_number: 2,
                            due_date: (now - chrono::Duration::days(20)).date_naive(),
                            due_amount: dec!(250),
                        },
                        NewScheduleEntry {
                            week_number: 3,
                            due_date: (now + chrono::Duration::days(10)).date_naive(),
                            due_amount: dec!(250),
                        },
                    ],
                )
                .await
                .unwrap();
            loan.loan_id
        };

        let service = service_with(loan_repository, MockCustomerRepository::default());
        assert!(service.is_delinquent(loan_id).await.unwrap());
    }

    #[tokio::test]
    async fn is_delinquent_is_false_with_only_one_past_due_entry() {
        let customer_id = Uuid::new_v4();
        let loan_repository = MockLoanRepository::default();
        let now = chrono::Utc::now();
        let loan_id = {
            let loan = loan_repository
                .create_loan(
                    customer_id,
                    NewLoan {
                        principal_amount: dec!(500),
                        term_weeks: 2,
                        annual_interest_rate: dec!(0.0),
                        total_amount: dec!(500),
                        weekly_installment: dec!(250),
                        start_date: (now - chrono::Duration::days(20)).date_naive(),
                        status: LoanStatus::Active.to_string(),
                    },
                    vec![
                        NewScheduleEntry {
                            week_number: 1,
                            due_date: (now - chrono::Duration::days(10)).date_naive(),
                            due_amount: dec!(250),
                        },
                        NewScheduleEntry {
                            week_number: 2,
                            due_date: (now + chrono::Duration::days(5)).date_naive(),
                            due_amount: dec!(250),
                        },
                    ],
                )
                .await
                .unwrap();
            loan.loan_id
        };

        let service = service_with(loan_repository, MockCustomerRepository::default());
        assert!(!service.is_delinquent(loan_id).await.unwrap());
    }

    #[tokio::test]
    async fn is_delinquent_is_not_found_for_an_unknown_loan() {
        let service = service_with(MockLoanRepository::default(), MockCustomerRepository::default());
        let err = service.is_delinquent(999).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_outstanding_is_not_found_for_an_unknown_loan() {
        let service = service_with(MockLoanRepository::default(), MockCustomerRepository::default());
        let err = service.get_outstanding(999).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
    }
}
