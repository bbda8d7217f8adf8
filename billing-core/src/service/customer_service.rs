use async_trait::async_trait;
use uuid::Uuid;

use crate::{domain::Customer, error::BillingResult};

/// Business rules over customers: creation, address/loan/delinquency
/// updates, and (de)activation. Every successful mutation publishes
/// exactly one `DomainEvent` through the service's `EventPublisher`;
/// publish failures are logged but never fail the mutation itself.
#[async_trait]
pub trait CustomerService: Send + Sync {
    /// Trims `name`/`address`; both must be non-empty after trimming.
    async fn create_new_customer(&self, name: &str, address: &str) -> BillingResult<Customer>;

    async fn get_customer(&self, customer_id: Uuid) -> BillingResult<Customer>;

    /// All customers with `active = true`.
    async fn list_active_customers(&self) -> BillingResult<Vec<Customer>>;

    /// No-op if the trimmed address equals the current one.
    async fn update_customer_address(&self, customer_id: Uuid, address: &str) -> BillingResult<Customer>;

    /// `loan_id` must be positive. No-op if already assigned to this
    /// customer; rejected if assigned to a different loan.
    async fn assign_loan_to_customer(&self, customer_id: Uuid, loan_id: i64) -> BillingResult<Customer>;

    /// Sets `is_delinquent` directly; publishes `CustomerDelinquencyChanged`
    /// only if the flag actually flips.
    async fn update_delinquency(&self, customer_id: Uuid, is_delinquent: bool) -> BillingResult<Customer>;

    /// Rejected if the customer carries a loan that is not yet paid off.
    async fn deactivate_customer(&self, customer_id: Uuid) -> BillingResult<Customer>;

    async fn reactivate_customer(&self, customer_id: Uuid) -> BillingResult<Customer>;

    async fn find_customer_by_loan(&self, loan_id: i64) -> BillingResult<Customer>;
}
