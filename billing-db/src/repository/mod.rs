pub mod customer_repository;
pub mod loan_repository;

pub use customer_repository::CustomerRepository;
pub use loan_repository::{LoanRepository, Tx};
