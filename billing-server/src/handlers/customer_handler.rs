use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::customer_dto::{
    AssignLoanRequest, CreateCustomerRequest, CustomerResponse, UpdateAddressRequest, UpdateDelinquencyRequest,
};
use crate::error_mapping::ApiError;
use crate::state::SharedState;
use billing_core::error::BillingError;

fn validation_error(e: validator::ValidationErrors) -> BillingError {
    BillingError::Validation { field: "body".to_string(), message: e.to_string() }
}

pub async fn create_customer(
    State(state): State<SharedState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    request.validate().map_err(validation_error)?;
    let customer = state
        .customer_service
        .create_new_customer(&request.name, &request.address)
        .await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

pub async fn get_customer(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer = state.customer_service.get_customer(customer_id).await?;
    Ok(Json(customer.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    #[serde(default)]
    pub loan_id: Option<i64>,
}

/// `GET /customers`: all active customers, or — when `?loan_id=` is given —
/// the single customer linked to that loan (per spec §6).
pub async fn list_customers(
    State(state): State<SharedState>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(loan_id) = query.loan_id {
        let customer = state.customer_service.find_customer_by_loan(loan_id).await?;
        return Ok(Json(serde_json::to_value(CustomerResponse::from(customer)).unwrap()));
    }

    let customers = state.customer_service.list_active_customers().await?;
    let responses: Vec<CustomerResponse> = customers.into_iter().map(CustomerResponse::from).collect();
    Ok(Json(serde_json::to_value(responses).unwrap()))
}

pub async fn update_address(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate().map_err(validation_error)?;
    state
        .customer_service
        .update_customer_address(customer_id, &request.address)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_loan(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<AssignLoanRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate().map_err(validation_error)?;
    state
        .customer_service
        .assign_loan_to_customer(customer_id, request.loan_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_delinquency(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateDelinquencyRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .customer_service
        .update_delinquency(customer_id, request.is_delinquent)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate_customer(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.customer_service.deactivate_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reactivate_customer(
    State(state): State<SharedState>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.customer_service.reactivate_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
