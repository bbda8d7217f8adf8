pub mod customer_service_impl;
pub mod loan_service_impl;

pub use customer_service_impl::*;
pub use loan_service_impl::*;
