use std::sync::Arc;

use async_trait::async_trait;
use billing_core::{
    domain::{Customer, CustomerEventPayload, DomainEvent},
    error::{BillingError, BillingResult},
    service::{CustomerService, EventPublisher},
};
use billing_db::{
    models::parse_loan_status,
    repository::{CustomerRepository, LoanRepository},
};
use uuid::Uuid;

use crate::mappers::CustomerMapper;

/// Production implementation of [`CustomerService`].
pub struct CustomerServiceImpl {
    customer_repository: Arc<dyn CustomerRepository>,
    loan_repository: Arc<dyn LoanRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl CustomerServiceImpl {
    pub fn new(
        customer_repository: Arc<dyn CustomerRepository>,
        loan_repository: Arc<dyn LoanRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            customer_repository,
            loan_repository,
            publisher,
        }
    }

    /// Publish failures are logged, never propagated: at-least-once on
    /// the database side, best-effort on the bus.
    async fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err, "failed to publish domain event");
        }
    }
}

fn to_heapless<const N: usize>(s: &str, field: &str) -> BillingResult<heapless::String<N>> {
    heapless::String::try_from(s).map_err(|_| BillingError::Validation {
        field: field.to_string(),
        message: format!("must be at most {N} characters"),
    })
}

#[async_trait]
impl CustomerService for CustomerServiceImpl {
    async fn create_new_customer(&self, name: &str, address: &str) -> BillingResult<Customer> {
        let name = name.trim();
        let address = address.trim();
        if name.is_empty() {
            return Err(BillingError::Validation {
                field: "name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if address.is_empty() {
            return Err(BillingError::Validation {
                field: "address".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let now = chrono::Utc::now();
        let model = billing_db::CustomerModel {
            customer_id: Uuid::new_v4(),
            name: to_heapless(name, "name")?,
            address: to_heapless(address, "address")?,
            is_delinquent: false,
            active: true,
            loan_id: None,
            create_date: now,
            updated_at: now,
        };

        let created = self.customer_repository.create(model).await?;
        let customer = CustomerMapper::from_model(created);

        self.publish(DomainEvent::CustomerCreated {
            payload: CustomerEventPayload::from(&customer),
        })
        .await;

        Ok(customer)
    }

    async fn get_customer(&self, customer_id: Uuid) -> BillingResult<Customer> {
        let model = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;
        Ok(CustomerMapper::from_model(model))
    }

    async fn list_active_customers(&self) -> BillingResult<Vec<Customer>> {
        let models = self.customer_repository.list_active().await?;
        Ok(models.into_iter().map(CustomerMapper::from_model).collect())
    }

    async fn update_customer_address(&self, customer_id: Uuid, address: &str) -> BillingResult<Customer> {
        let address = address.trim();
        if address.is_empty() {
            return Err(BillingError::Validation {
                field: "address".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let current = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        if current.address.as_str() == address {
            return Ok(CustomerMapper::from_model(current));
        }

        let updated = self.customer_repository.update_address(customer_id, address).await?;
        let customer = CustomerMapper::from_model(updated);

        self.publish(DomainEvent::CustomerUpdated {
            payload: CustomerEventPayload::from(&customer),
        })
        .await;

        Ok(customer)
    }

    async fn assign_loan_to_customer(&self, customer_id: Uuid, loan_id: i64) -> BillingResult<Customer> {
        if loan_id <= 0 {
            return Err(BillingError::Validation {
                field: "loan_id".to_string(),
                message: "must be positive".to_string(),
            });
        }

        let current = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        if current.loan_id == Some(loan_id) {
            return Ok(CustomerMapper::from_model(current));
        }
        if current.loan_id.is_some() {
            return Err(BillingError::CustomerAlreadyHasLoan(customer_id));
        }

        let assigned = self.customer_repository.assign_loan(customer_id, loan_id).await?;
        if !assigned {
            return Err(BillingError::Conflict(format!(
                "customer {customer_id} was concurrently assigned a loan"
            )));
        }

        let model = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;
        let customer = CustomerMapper::from_model(model);

        self.publish(DomainEvent::CustomerUpdated {
            payload: CustomerEventPayload::from(&customer),
        })
        .await;

        Ok(customer)
    }

    async fn update_delinquency(&self, customer_id: Uuid, is_delinquent: bool) -> BillingResult<Customer> {
        let current = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        let old_status = current.is_delinquent;
        let updated = self
            .customer_repository
            .update_delinquency(customer_id, is_delinquent)
            .await?;
        let customer = CustomerMapper::from_model(updated);

        if old_status != is_delinquent {
            self.publish(DomainEvent::CustomerDelinquencyChanged {
                payload: CustomerEventPayload::from(&customer),
                old_status,
                new_status: is_delinquent,
            })
            .await;
        }

        Ok(customer)
    }

    async fn deactivate_customer(&self, customer_id: Uuid) -> BillingResult<Customer> {
        let current = self
            .customer_repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        let linked_loan_status = match current.loan_id {
            Some(loan_id) => {
                let loan = self.loan_repository.get_loan_by_id(loan_id).await?;
                match loan {
                    Some(loan) => Some(
                        parse_loan_status(&loan.status)
                            .map_err(|e| BillingError::Internal(format!("corrupt loan status: {e}")))?,
                    ),
                    None => None,
                }
            }
            None => None,
        };

        if CustomerMapper::from_model(current.clone()).deactivation_blocked_by_loan(linked_loan_status) {
            return Err(BillingError::Conflict(format!(
                "customer {customer_id} has an active loan linked"
            )));
        }

        let updated = self.customer_repository.set_active(customer_id, false).await?;
        let customer = CustomerMapper::from_model(updated);

        self.publish(DomainEvent::CustomerUpdated {
            payload: CustomerEventPayload::from(&customer),
        })
        .await;

        Ok(customer)
    }

    async fn reactivate_customer(&self, customer_id: Uuid) -> BillingResult<Customer> {
        let updated = self.customer_repository.set_active(customer_id, true).await?;
        let customer = CustomerMapper::from_model(updated);

        self.publish(DomainEvent::CustomerUpdated {
            payload: CustomerEventPayload::from(&customer),
        })
        .await;

        Ok(customer)
    }

    async fn find_customer_by_loan(&self, loan_id: i64) -> BillingResult<Customer> {
        let model = self
            .customer_repository
            .find_by_loan_id(loan_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("customer for loan {loan_id}")))?;
        Ok(CustomerMapper::from_model(model))
    }
}
