use billing_core::domain::{Loan, LoanStatus, ScheduleEntry, ScheduleEntryStatus};
use billing_db::models::{parse_loan_status, parse_schedule_entry_status, LoanModel, ScheduleEntryModel};

pub struct LoanMapper;

impl LoanMapper {
    pub fn loan_status_to_db(status: LoanStatus) -> String {
        status.to_string()
    }

    pub fn loan_status_from_db(raw: &str) -> Result<LoanStatus, String> {
        parse_loan_status(raw)
    }

    pub fn schedule_status_to_db(status: ScheduleEntryStatus) -> String {
        status.to_string()
    }

    pub fn schedule_status_from_db(raw: &str) -> Result<ScheduleEntryStatus, String> {
        parse_schedule_entry_status(raw)
    }

    pub fn loan_from_model(model: LoanModel) -> Result<Loan, String> {
        Ok(Loan {
            id: model.loan_id,
            principal_amount: model.principal_amount,
            interest_rate: model.annual_interest_rate,
            term_weeks: model.term_weeks,
            weekly_payment_amount: model.weekly_installment,
            total_loan_amount: model.total_amount,
            start_date: model.start_date,
            status: parse_loan_status(&model.status)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub fn schedule_entry_from_model(model: ScheduleEntryModel) -> Result<ScheduleEntry, String> {
        Ok(ScheduleEntry {
            id: model.schedule_id,
            loan_id: model.loan_id,
            week_number: model.week_number,
            due_date: model.due_date,
            due_amount: model.due_amount,
            paid_amount: model.paid_amount,
            payment_date: model.paid_at.map(|dt| dt.date_naive()),
            status: parse_schedule_entry_status(&model.status)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
