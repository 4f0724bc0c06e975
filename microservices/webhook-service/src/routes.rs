//! Router configuration for the webhook service

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, payment, telephony, voice, AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Telephony provider
        .route("/webhooks/telephony/call-status", post(telephony::call_status))
        .route(
            "/webhooks/telephony/test-call-status/{customer_id}",
            post(telephony::test_call_status),
        )
        .route("/webhooks/telephony/voice/{customer_id}", post(voice::voice))
        // Payment provider
        .route("/webhooks/payment/events", post(payment::payment_events))
        .with_state(state)
}
