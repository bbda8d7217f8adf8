//! Live-database exercise of the payment state machine (spec §4.2, §8).
//! Requires a reachable Postgres instance; point `DATABASE_URL` at it.

mod commons;

use std::sync::Arc;

use billing_core::domain::LoanStatus;
use billing_core::service::NoopEventPublisher;
use billing_db::repository::{CustomerRepository, LoanRepository};
use billing_logic::services::LoanServiceImpl;
use billing_postgres::{PostgresCustomerRepository, PostgresLoanRepository};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn seed_active_customer(customer_repository: &dyn CustomerRepository) -> Uuid {
    let now = chrono::Utc::now();
    let customer_id = Uuid::new_v4();
    customer_repository
        .create(billing_db::CustomerModel {
            customer_id,
            name: heapless::String::try_from("Alice").unwrap(),
            address: heapless::String::try_from("1 Main").unwrap(),
            is_delinquent: false,
            active: true,
            loan_id: None,
            create_date: now,
            updated_at: now,
        })
        .await
        .unwrap();
    customer_id
}

#[tokio::test]
async fn full_payoff_transitions_the_loan_to_paid_off() {
    let pool = commons::establish_connection().await;
    commons::truncate_all(&pool).await;

    let customer_repository = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let service = LoanServiceImpl::new(
        loan_repository.clone(),
        customer_repository.clone(),
        Arc::new(NoopEventPublisher),
    );

    let customer_id = seed_active_customer(customer_repository.as_ref()).await;
    let loan = service
        .create_loan(
            customer_id,
            dec!(5000000),
            50,
            dec!(0.10),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(loan.total_loan_amount, dec!(5500000.00));
    assert_eq!(loan.weekly_payment_amount, dec!(110000.00));

    for _ in 0..49 {
        service.make_payment(loan.id, dec!(110000.00)).await.unwrap();
    }

    let mid_outstanding = service.get_outstanding(loan.id).await.unwrap();
    assert_eq!(mid_outstanding, dec!(110000.00));

    service.make_payment(loan.id, dec!(110000.00)).await.unwrap();

    let final_loan = service.get_loan(loan.id).await.unwrap();
    assert_eq!(final_loan.loan.status, LoanStatus::PaidOff);
    assert!(final_loan.schedule.iter().all(|e| e.status == billing_core::domain::ScheduleEntryStatus::Paid));
    assert_eq!(service.get_outstanding(loan.id).await.unwrap(), dec!(0.00));

    let err = service.make_payment(loan.id, dec!(110000.00)).await.unwrap_err();
    assert!(matches!(err, billing_core::error::BillingError::LoanFullyPaid(id) if id == loan.id));
}

#[tokio::test]
async fn payment_amount_mismatch_is_rejected_without_mutation() {
    let pool = commons::establish_connection().await;
    commons::truncate_all(&pool).await;

    let customer_repository = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let service = LoanServiceImpl::new(
        loan_repository.clone(),
        customer_repository.clone(),
        Arc::new(NoopEventPublisher),
    );

    let customer_id = seed_active_customer(customer_repository.as_ref()).await;
    let loan = service
        .create_loan(
            customer_id,
            dec!(5000000),
            50,
            dec!(0.10),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .await
        .unwrap();

    let err = service.make_payment(loan.id, dec!(109999.99)).await.unwrap_err();
    assert!(matches!(err, billing_core::error::BillingError::InvalidPaymentAmount));

    let schedule = loan_repository.get_schedule_by_loan_id(loan.id).await.unwrap();
    assert!(schedule.iter().all(|e| e.status == "PENDING"));
}

#[tokio::test]
async fn create_loan_rejects_a_second_loan_for_the_same_customer() {
    let pool = commons::establish_connection().await;
    commons::truncate_all(&pool).await;

    let customer_repository = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let service = LoanServiceImpl::new(
        loan_repository.clone(),
        customer_repository.clone(),
        Arc::new(NoopEventPublisher),
    );

    let customer_id = seed_active_customer(customer_repository.as_ref()).await;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    service
        .create_loan(customer_id, dec!(5000000), 50, dec!(0.10), start)
        .await
        .unwrap();

    let err = service
        .create_loan(customer_id, dec!(1000), 10, dec!(0.05), start)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        billing_core::error::BillingError::CustomerAlreadyHasLoan(id) if id == customer_id
    ));
}
