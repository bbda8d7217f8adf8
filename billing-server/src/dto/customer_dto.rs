use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use billing_core::domain::Customer;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "address must be 1-500 characters"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 500, message = "address must be 1-500 characters"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignLoanRequest {
    #[validate(range(min = 1, message = "loan_id must be positive"))]
    pub loan_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDelinquencyRequest {
    pub is_delinquent: bool,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub customer_id: Uuid,
    pub name: String,
    pub address: String,
    pub is_delinquent: bool,
    pub active: bool,
    pub loan_id: Option<i64>,
    pub create_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        CustomerResponse {
            customer_id: c.customer_id,
            name: c.name.as_str().to_string(),
            address: c.address.as_str().to_string(),
            is_delinquent: c.is_delinquent,
            active: c.active,
            loan_id: c.loan_id,
            create_date: c.create_date,
            updated_at: c.updated_at,
        }
    }
}
