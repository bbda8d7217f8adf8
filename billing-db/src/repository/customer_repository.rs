use async_trait::async_trait;
use billing_core::BillingResult;
use uuid::Uuid;

use crate::models::CustomerModel;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: CustomerModel) -> BillingResult<CustomerModel>;

    async fn find_by_id(&self, customer_id: Uuid) -> BillingResult<Option<CustomerModel>>;

    /// Reverse lookup via the unique `loan_id` column.
    async fn find_by_loan_id(&self, loan_id: i64) -> BillingResult<Option<CustomerModel>>;

    async fn list_active(&self) -> BillingResult<Vec<CustomerModel>>;

    async fn update_address(&self, customer_id: Uuid, address: &str) -> BillingResult<CustomerModel>;

    /// `UPDATE customers SET loan_id = ? WHERE customer_id = ? AND loan_id IS NULL`.
    /// Returns `Ok(false)` when the guard excluded the row (already linked),
    /// distinguishing a conflict from a missing customer.
    async fn assign_loan(&self, customer_id: Uuid, loan_id: i64) -> BillingResult<bool>;

    async fn update_delinquency(&self, customer_id: Uuid, is_delinquent: bool) -> BillingResult<CustomerModel>;

    async fn set_active(&self, customer_id: Uuid, active: bool) -> BillingResult<CustomerModel>;
}
