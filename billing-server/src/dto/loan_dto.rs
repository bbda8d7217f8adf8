use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use billing_core::domain::{Loan, LoanStatus, ScheduleEntry, ScheduleEntryStatus, LoanWithSchedule};

fn validate_positive(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(validator::ValidationError::new("must be positive"))
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(validator::ValidationError::new("must not be negative"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    pub customer_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub principal_amount: Decimal,
    #[validate(range(min = 1, message = "term_weeks must be at least 1"))]
    pub term_weeks: i32,
    #[validate(custom(function = "validate_non_negative"))]
    pub annual_interest_rate: Decimal,
    pub start_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MakePaymentRequest {
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: i64,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub term_weeks: i32,
    pub weekly_payment_amount: Decimal,
    pub total_loan_amount: Decimal,
    pub start_date: NaiveDate,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleEntryResponse>>,
}

impl LoanResponse {
    pub fn from_loan(loan: Loan) -> Self {
        LoanResponse {
            id: loan.id,
            principal_amount: loan.principal_amount,
            interest_rate: loan.interest_rate,
            term_weeks: loan.term_weeks,
            weekly_payment_amount: loan.weekly_payment_amount,
            total_loan_amount: loan.total_loan_amount,
            start_date: loan.start_date,
            status: loan.status,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
            schedule: None,
        }
    }

    pub fn from_loan_with_schedule(with_schedule: LoanWithSchedule) -> Self {
        let mut response = Self::from_loan(with_schedule.loan);
        response.schedule = Some(with_schedule.schedule.into_iter().map(ScheduleEntryResponse::from).collect());
        response
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleEntryResponse {
    pub id: Uuid,
    pub week_number: i32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
    pub paid_amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub status: ScheduleEntryStatus,
}

impl From<ScheduleEntry> for ScheduleEntryResponse {
    fn from(e: ScheduleEntry) -> Self {
        ScheduleEntryResponse {
            id: e.id,
            week_number: e.week_number,
            due_date: e.due_date,
            due_amount: e.due_amount,
            paid_amount: e.paid_amount,
            payment_date: e.payment_date,
            status: e.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutstandingResponse {
    pub outstanding_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DelinquentResponse {
    pub is_delinquent: bool,
}
