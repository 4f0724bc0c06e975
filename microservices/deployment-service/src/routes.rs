//! Router configuration for the deployment service

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
        // Provisioning
        .route("/deploy", post(handlers::deploy))
        .route("/deploy-status/{customer_id}", get(handlers::deploy_status))
        .with_state(state)
}
