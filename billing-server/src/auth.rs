use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error_mapping::ApiError;
use crate::state::SharedState;
use billing_core::error::BillingError;

/// The only claims this service cares about: who, and until when. The
/// subject claim is named `username`, per spec §6, rather than the more
/// conventional `sub`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn mint_token(subject: &str, secret: &str, ttl_hours: i64) -> Result<String, BillingError> {
    let now = Utc::now();
    let claims = Claims {
        username: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| BillingError::Internal(format!("failed to mint token: {e}")))
}

fn verify_token(token: &str, secret: &str) -> Result<Claims, BillingError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| BillingError::Unauthorized)
}

/// Rejects any request whose `Authorization: Bearer <token>` header is
/// missing, malformed, or fails signature/expiry verification.
pub async fn require_bearer_auth(
    State(state): State<SharedState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(BillingError::Unauthorized)?;

    verify_token(token, &state.config.jwt.secret)?;

    Ok(next.run(request).await)
}
