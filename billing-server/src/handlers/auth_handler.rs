use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::mint_token;
use crate::error_mapping::ApiError;
use crate::state::SharedState;
use billing_core::error::BillingError;

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in_hours: i64,
}

/// Issues a bearer token for the given caller identity. There is no
/// credential check here: this service trusts whatever sits in front of
/// it to have already authenticated the caller (§6).
pub async fn issue_token(
    State(state): State<SharedState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| BillingError::Validation { field: "username".to_string(), message: e.to_string() })?;

    let token = mint_token(&request.username, &state.config.jwt.secret, state.config.jwt.ttl_hours)?;

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in_hours: state.config.jwt.ttl_hours,
    }))
}
