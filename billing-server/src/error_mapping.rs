use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use billing_core::error::BillingError;
use serde::Serialize;

/// Wraps `BillingError` so it can be returned directly from a handler.
/// The HTTP mapping lives here, at the edge, per spec §7: `billing-core`
/// itself never mentions a status code.
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            BillingError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            BillingError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            BillingError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            BillingError::CustomerAlreadyHasLoan(_) => (StatusCode::CONFLICT, "customer_already_has_loan"),
            BillingError::InvalidPaymentAmount => (StatusCode::BAD_REQUEST, "invalid_payment_amount"),
            BillingError::LoanFullyPaid(_) => (StatusCode::CONFLICT, "loan_fully_paid"),
            BillingError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            BillingError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            BillingError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            BillingError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: kind.to_string(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
