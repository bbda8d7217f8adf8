pub mod auth_handler;
pub mod customer_handler;
pub mod loan_handler;
