use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A loan's lifecycle status.
///
/// `Delinquent` is carried in the schema for legacy rows only; no write
/// path in this crate ever produces it. The authoritative delinquency
/// signal is the computed view in `LoanService::is_delinquent`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    PaidOff,
    Delinquent,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "ACTIVE"),
            LoanStatus::PaidOff => write!(f, "PAID_OFF"),
            LoanStatus::Delinquent => write!(f, "DELINQUENT"),
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(LoanStatus::Active),
            "PAID_OFF" => Ok(LoanStatus::PaidOff),
            "DELINQUENT" => Ok(LoanStatus::Delinquent),
            other => Err(format!("invalid loan status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScheduleEntryStatus {
    Pending,
    Paid,
    Missed,
}

impl std::fmt::Display for ScheduleEntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleEntryStatus::Pending => write!(f, "PENDING"),
            ScheduleEntryStatus::Paid => write!(f, "PAID"),
            ScheduleEntryStatus::Missed => write!(f, "MISSED"),
        }
    }
}

impl std::str::FromStr for ScheduleEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ScheduleEntryStatus::Pending),
            "PAID" => Ok(ScheduleEntryStatus::Paid),
            "MISSED" => Ok(ScheduleEntryStatus::Missed),
            other => Err(format!("invalid schedule entry status: {other}")),
        }
    }
}

/// An installment loan: a fixed principal repaid through a fixed weekly
/// schedule at a flat interest rate over the full term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
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
}

/// One week's installment on a loan's repayment schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub loan_id: i64,
    pub week_number: i32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
    pub paid_amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub status: ScheduleEntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A loan together with its full repayment schedule, ordered by week number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanWithSchedule {
    pub loan: Loan,
    pub schedule: Vec<ScheduleEntry>,
}

/// Input to `LoanService::create_loan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoanRequest {
    pub customer_id: Uuid,
    pub principal_amount: Decimal,
    pub term_weeks: i32,
    pub annual_interest_rate: Decimal,
    pub start_date: NaiveDate,
}

/// A draft schedule entry, produced before any row has an id.
#[derive(Debug, Clone)]
pub struct DraftScheduleEntry {
    pub week_number: i32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
}

/// Generates the weekly repayment schedule for a new loan.
///
/// `due_amount` is the same fixed installment for every week except the
/// last, which absorbs whatever rounding remainder accumulated so the
/// schedule sums to exactly `total_amount`.
pub fn generate_schedule(
    total_amount: Decimal,
    term_weeks: i32,
    weekly_payment: Decimal,
    start_date: NaiveDate,
) -> Vec<DraftScheduleEntry> {
    let mut entries = Vec::with_capacity(term_weeks as usize);
    let mut running_total = Decimal::ZERO;

    for week in 1..=term_weeks {
        let due_date = start_date + chrono::Duration::days(7 * week as i64);
        let due_amount = if week == term_weeks {
            (total_amount - running_total).round_dp(2)
        } else {
            weekly_payment
        };
        running_total += due_amount;
        entries.push(DraftScheduleEntry {
            week_number: week,
            due_date,
            due_amount,
        });
    }

    entries
}

/// Computes `weekly_payment_amount = round2(total / term_weeks)` and
/// `total_loan_amount = principal * (1 + rate)`.
pub fn compute_loan_amounts(principal: Decimal, annual_rate: Decimal, term_weeks: i32) -> (Decimal, Decimal) {
    let total = (principal * (Decimal::ONE + annual_rate)).round_dp(2);
    let weekly = (total / Decimal::from(term_weeks)).round_dp(2);
    (total, weekly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn compute_loan_amounts_matches_the_happy_path_numbers() {
        let (total, weekly) = compute_loan_amounts(dec!(5000000), dec!(0.10), 50);
        assert_eq!(total, dec!(5500000.00));
        assert_eq!(weekly, dec!(110000.00));
    }

    #[test]
    fn generate_schedule_has_one_entry_per_week_in_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (total, weekly) = compute_loan_amounts(dec!(5000000), dec!(0.10), 50);
        let schedule = generate_schedule(total, 50, weekly, start);

        assert_eq!(schedule.len(), 50);
        assert_eq!(schedule[0].week_number, 1);
        assert_eq!(schedule[0].due_date, start + chrono::Duration::days(7));
        assert_eq!(schedule[49].week_number, 50);
        assert_eq!(schedule[49].due_date, start + chrono::Duration::days(350));
    }

    #[test]
    fn generate_schedule_due_dates_advance_by_exactly_seven_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = generate_schedule(dec!(1000.00), 4, dec!(250.00), start);
        for pair in schedule.windows(2) {
            assert_eq!(pair[1].due_date - pair[0].due_date, chrono::Duration::days(7));
        }
    }

    #[test]
    fn generate_schedule_sums_to_the_total_amount_exactly() {
        // 100 / 3 forces rounding remainders onto the last installment.
        let total = dec!(100.00);
        let weekly = (total / Decimal::from(3)).round_dp(2);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = generate_schedule(total, 3, weekly, start);

        let sum: Decimal = schedule.iter().map(|e| e.due_amount).sum();
        assert_eq!(sum, total);
        // first two installments are the uniform weekly amount...
        assert_eq!(schedule[0].due_amount, weekly);
        assert_eq!(schedule[1].due_amount, weekly);
        // ...and the last absorbs whatever remainder is left over.
        assert_ne!(schedule[2].due_amount, weekly);
    }

    #[test]
    fn compute_loan_amounts_rounds_to_two_decimal_places() {
        let (total, weekly) = compute_loan_amounts(dec!(1000), dec!(0.075), 3);
        assert_eq!(total, dec!(1075.00));
        // 1075 / 3 = 358.333... rounds to 358.33, leaving 0.01 for the last week.
        assert_eq!(weekly, dec!(358.33));
    }
}
