pub mod customer_repository_impl;
pub mod loan_repository_impl;

pub use customer_repository_impl::PostgresCustomerRepository;
pub use loan_repository_impl::PostgresLoanRepository;