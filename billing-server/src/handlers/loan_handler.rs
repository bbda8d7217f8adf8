use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::dto::loan_dto::{
    CreateLoanRequest, DelinquentResponse, LoanResponse, MakePaymentRequest, OutstandingResponse,
};
use crate::error_mapping::ApiError;
use crate::state::SharedState;
use billing_core::error::BillingError;

fn validation_error(e: validator::ValidationErrors) -> BillingError {
    BillingError::Validation { field: "body".to_string(), message: e.to_string() }
}

pub async fn create_loan(
    State(state): State<SharedState>,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    request.validate().map_err(validation_error)?;
    let loan = state
        .loan_service
        .create_loan(
            request.customer_id,
            request.principal_amount,
            request.term_weeks,
            request.annual_interest_rate,
            request.start_date,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(LoanResponse::from_loan(loan))))
}

#[derive(Debug, Deserialize)]
pub struct GetLoanQuery {
    #[serde(default)]
    pub include: Option<String>,
}

pub async fn get_loan(
    State(state): State<SharedState>,
    Path(loan_id): Path<i64>,
    Query(query): Query<GetLoanQuery>,
) -> Result<Json<LoanResponse>, ApiError> {
    let wants_schedule = query.include.as_deref() == Some("schedule");
    let response = if wants_schedule {
        let loan_with_schedule = state.loan_service.get_loan(loan_id).await?;
        LoanResponse::from_loan_with_schedule(loan_with_schedule)
    } else {
        let loan_with_schedule = state.loan_service.get_loan(loan_id).await?;
        LoanResponse::from_loan(loan_with_schedule.loan)
    };
    Ok(Json(response))
}

pub async fn get_outstanding(
    State(state): State<SharedState>,
    Path(loan_id): Path<i64>,
) -> Result<Json<OutstandingResponse>, ApiError> {
    let outstanding_amount = state.loan_service.get_outstanding(loan_id).await?;
    Ok(Json(OutstandingResponse { outstanding_amount }))
}

pub async fn get_delinquent(
    State(state): State<SharedState>,
    Path(loan_id): Path<i64>,
) -> Result<Json<DelinquentResponse>, ApiError> {
    let is_delinquent = state.loan_service.is_delinquent(loan_id).await?;
    Ok(Json(DelinquentResponse { is_delinquent }))
}

pub async fn make_payment(
    State(state): State<SharedState>,
    Path(loan_id): Path<i64>,
    Json(request): Json<MakePaymentRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate().map_err(validation_error)?;
    state.loan_service.make_payment(loan_id, request.amount).await?;
    Ok(StatusCode::NO_CONTENT)
}
