use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

/// The error taxonomy every layer of the engine propagates through.
///
/// Handlers in `billing-server` map each variant to an HTTP status; the
/// mapping lives at the edge, not here, so this crate stays free of any
/// HTTP dependency.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum BillingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("customer {0} already has an active loan")]
    CustomerAlreadyHasLoan(uuid::Uuid),

    #[error("payment amount does not match the due amount for the oldest pending installment")]
    InvalidPaymentAmount,

    #[error("loan {0} is already fully paid")]
    LoanFullyPaid(i64),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => BillingError::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db_err) => {
                // Postgres unique_violation
                if db_err.code().as_deref() == Some("23505") {
                    BillingError::Conflict(db_err.message().to_string())
                } else {
                    BillingError::Database(db_err.message().to_string())
                }
            }
            other => BillingError::Database(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: BillingError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, BillingError::NotFound(_)));
    }
}
