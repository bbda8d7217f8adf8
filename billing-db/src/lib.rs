pub mod models;
pub mod repository;

pub use models::{CustomerModel, LoanModel, ScheduleEntryModel};
pub use repository::{CustomerRepository, LoanRepository, Tx};
