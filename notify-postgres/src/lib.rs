pub mod projection_impl;

pub use projection_impl::PostgresCustomerProjection;
