use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use notify_core::domain::NotifyCustomer;
use notify_core::error::{NotifyError, NotifyResult};
use notify_core::projection::CustomerProjection;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: Uuid,
    name: String,
    address: String,
    is_delinquent: bool,
    active: bool,
    loan_id: Option<i64>,
    create_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for NotifyCustomer {
    type Error = NotifyError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(NotifyCustomer {
            customer_id: row.customer_id,
            name: to_heapless(&row.name, "name")?,
            address: to_heapless(&row.address, "address")?,
            is_delinquent: row.is_delinquent,
            active: row.active,
            loan_id: row.loan_id,
            create_date: row.create_date,
            updated_at: row.updated_at,
        })
    }
}

fn to_heapless<const N: usize>(s: &str, field: &str) -> NotifyResult<HeaplessString<N>> {
    HeaplessString::try_from(s).map_err(|_| {
        NotifyError::Internal(format!("corrupt row: {field} exceeds {N} characters"))
    })
}

const COLUMNS: &str = "customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at";

/// The projection's Postgres backing store. `upsert` is the only write
/// path (§4.8); everything else is a read-through for the notify
/// service's own query surface.
pub struct PostgresCustomerProjection {
    pool: PgPool,
}

impl PostgresCustomerProjection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerProjection for PostgresCustomerProjection {
    async fn upsert(&self, customer: NotifyCustomer) -> NotifyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, name, address, is_delinquent, active, loan_id, create_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (customer_id) DO UPDATE SET
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                is_delinquent = EXCLUDED.is_delinquent,
                active = EXCLUDED.active,
                loan_id = EXCLUDED.loan_id,
                updated_at = EXCLUDED.updated_at
            WHERE customers.updated_at < EXCLUDED.updated_at
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
        .execute(&self.pool)
        .await
        .map_err(NotifyError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, customer_id: Uuid) -> NotifyResult<Option<NotifyCustomer>> {
        let query = format!("SELECT {COLUMNS} FROM customers WHERE customer_id = $1");
        let row: Option<CustomerRow> = sqlx::query_as(&query)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(NotifyError::from)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_active(&self) -> NotifyResult<Vec<NotifyCustomer>> {
        let query = format!("SELECT {COLUMNS} FROM customers WHERE active = true ORDER BY create_date ASC");
        let rows: Vec<CustomerRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(NotifyError::from)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_delinquent(&self) -> NotifyResult<Vec<NotifyCustomer>> {
        let query =
            format!("SELECT {COLUMNS} FROM customers WHERE active = true AND is_delinquent = true ORDER BY updated_at DESC");
        let rows: Vec<CustomerRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(NotifyError::from)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
