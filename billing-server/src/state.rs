use std::sync::Arc;

use billing_core::config::BillingConfig;
use billing_core::service::{CustomerService, LoanService};

use crate::metrics::Metrics;
use crate::rate_limit::IpRateLimiter;

/// Everything a handler needs, shared behind `Arc` across the router.
///
/// Service fields are trait objects: handlers never know whether they're
/// talking to Postgres or a test double.
pub struct AppState {
    pub loan_service: Arc<dyn LoanService>,
    pub customer_service: Arc<dyn CustomerService>,
    pub config: BillingConfig,
    pub metrics: Arc<Metrics>,
    pub rate_limiter: IpRateLimiter,
}

pub type SharedState = Arc<AppState>;
