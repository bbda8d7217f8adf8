use async_trait::async_trait;
use billing_core::error::{BillingError, BillingResult};
use billing_db::models::CustomerModel;
use billing_db::repository::CustomerRepository;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::HeaplessStringWrapper;

/// Row shape returned by every query below. `name`/`address` decode
/// straight into the bounded `heapless::String` via
/// [`HeaplessStringWrapper`]; an over-length value fails the query at the
/// driver layer instead of silently truncating.
#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: Uuid,
    name: HeaplessStringWrapper<255>,
    address: HeaplessStringWrapper<500>,
    is_delinquent: bool,
    active: bool,
    loan_id: Option<i64>,
    create_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for CustomerModel {
    fn from(row: CustomerRow) -> Self {
        CustomerModel {
            customer_id: row.customer_id,
            name: row.name.0,
            address: row.address.0,
            is_delinquent: row.is_delinquent,
            active: row.active,
            loan_id: row.loan_id,
            create_date: row.create_date,
            updated_at: row.updated_at,
        }
    }
}

/// Persistence for `customers`, per spec §3 and §4.4's unique-`loan_id`
/// constraint. The constraint itself lives in the schema (`UNIQUE(loan_id)`);
/// this repository only translates the resulting `23505` into a typed error.
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn create(&self, customer: CustomerModel) -> BillingResult<CustomerModel> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at
            "#,
        )
        .bind(customer.customer_id)
        .bind(customer.name.as_str())
        .bind(customer.address.as_str())
        .bind(customer.is_delinquent)
        .bind(customer.active)
        .bind(customer.loan_id)
        .bind(customer.create_date)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(BillingError::from)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, customer_id: Uuid) -> BillingResult<Option<CustomerModel>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at \
             FROM customers WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(BillingError::from)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_loan_id(&self, loan_id: i64) -> BillingResult<Option<CustomerModel>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at \
             FROM customers WHERE loan_id = $1",
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(BillingError::from)?;

        Ok(row.map(Into::into))
    }

    async fn list_active(&self) -> BillingResult<Vec<CustomerModel>> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at \
             FROM customers WHERE active = true ORDER BY create_date ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(BillingError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_address(&self, customer_id: Uuid, address: &str) -> BillingResult<CustomerModel> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            UPDATE customers SET address = $2, updated_at = now()
            WHERE customer_id = $1
            RETURNING customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(BillingError::from)?
        .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        Ok(row.into())
    }

    async fn assign_loan(&self, customer_id: Uuid, loan_id: i64) -> BillingResult<bool> {
        let result = sqlx::query(
            "UPDATE customers SET loan_id = $2, updated_at = now() WHERE customer_id = $1 AND loan_id IS NULL",
        )
        .bind(customer_id)
        .bind(loan_id)
        .execute(&self.pool)
        .await
        .map_err(BillingError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_delinquency(&self, customer_id: Uuid, is_delinquent: bool) -> BillingResult<CustomerModel> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            UPDATE customers SET is_delinquent = $2, updated_at = now()
            WHERE customer_id = $1
            RETURNING customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(is_delinquent)
        .fetch_optional(&self.pool)
        .await
        .map_err(BillingError::from)?
        .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        Ok(row.into())
    }

    async fn set_active(&self, customer_id: Uuid, active: bool) -> BillingResult<CustomerModel> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            UPDATE customers SET active = $2, updated_at = now()
            WHERE customer_id = $1
            RETURNING customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(BillingError::from)?
        .ok_or_else(|| BillingError::NotFound(format!("customer {customer_id}")))?;

        Ok(row.into())
    }
}
