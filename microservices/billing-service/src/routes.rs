//! Router configuration for the billing service

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::AppState;

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Usage
        .route("/v1/usage/record", post(handlers::record_usage))
        .route("/v1/usage/{customer_id}/summary", get(handlers::usage_summary))
        .with_state(state)
}
