pub mod customer;
pub mod loan;

pub use customer::*;
pub use loan::*;

use billing_core::domain::{LoanStatus, ScheduleEntryStatus};

/// Parses the text stored in `loans.status`. Row-level parse errors are
/// treated as data corruption, not a recoverable outcome, by callers.
pub fn parse_loan_status(raw: &str) -> Result<LoanStatus, String> {
    raw.parse()
}

/// Parses the text stored in `loan_schedule.status`.
pub fn parse_schedule_entry_status(raw: &str) -> Result<ScheduleEntryStatus, String> {
    raw.parse()
}
