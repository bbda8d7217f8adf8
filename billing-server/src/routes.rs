use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_auth;
use crate::handlers::{auth_handler, customer_handler, loan_handler};
use crate::metrics::{metrics_handler, track_metrics};
use crate::rate_limit::rate_limit;
use crate::state::SharedState;

/// Assembles the full HTTP surface described in spec §6: an unauthenticated
/// token endpoint and metrics scrape, and a bearer-protected API behind
/// per-IP rate limiting and request tracing.
pub fn build_router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/customers", post(customer_handler::create_customer).get(customer_handler::list_customers))
        .route(
            "/customers/:customer_id",
            get(customer_handler::get_customer).delete(customer_handler::deactivate_customer),
        )
        .route("/customers/:customer_id/address", put(customer_handler::update_address))
        .route("/customers/:customer_id/loan", put(customer_handler::assign_loan))
        .route("/customers/:customer_id/delinquency", put(customer_handler::update_delinquency))
        .route("/customers/:customer_id/reactivate", put(customer_handler::reactivate_customer))
        .route("/loans", post(loan_handler::create_loan))
        .route("/loans/:loan_id", get(loan_handler::get_loan))
        .route("/loans/:loan_id/outstanding", get(loan_handler::get_outstanding))
        .route("/loans/:loan_id/delinquent", get(loan_handler::get_delinquent))
        .route("/loans/:loan_id/payments", post(loan_handler::make_payment))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/auth/token", post(auth_handler::issue_token))
        .route(&state.config.metrics.path, get(metrics_handler))
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(axum::middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
