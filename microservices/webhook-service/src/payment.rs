//! Payment provider webhook handler.
//!
//! Subscription lifecycle events drive both billing state and agent
//! availability. Every handler applies "set to X" semantics keyed by
//! the provider's subscription id, so redelivered or out-of-order
//! events converge on the same row state.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use frontdesk_providers::signature::verify_payment_signature;
use frontdesk_store::subscriptions::SubscriptionRepository;

use crate::error::{Error, Result};
use crate::events::PaymentEvent;
use crate::AppState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn payment_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::MissingSignature)?;

    // The signature covers the exact bytes received; the body must not
    // be parsed or re-serialized before this check.
    if !verify_payment_signature(
        &state.secrets.payment_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    ) {
        return Err(Error::InvalidSignature);
    }

    let event = PaymentEvent::parse(&body).map_err(|e| Error::InvalidRequest(e.to_string()))?;
    let repo = SubscriptionRepository::new(&state.db);

    match event {
        PaymentEvent::PaymentSucceeded(invoice) => match invoice.subscription.as_deref() {
            Some(subscription_id) => {
                info!(subscription_id, "Payment succeeded");
                repo.activate_with_period(
                    subscription_id,
                    invoice.period_start(),
                    invoice.period_end(),
                )
                .await?;
            }
            None => info!("Invoice not tied to a subscription, skipping"),
        },

        PaymentEvent::PaymentFailed(invoice) => {
            if let Some(subscription_id) = invoice.subscription.as_deref() {
                info!(subscription_id, "Payment failed, pausing agent");
                repo.mark_past_due_and_pause(subscription_id).await?;
            }
        }

        PaymentEvent::SubscriptionUpdated(subscription) => {
            let status = subscription.mapped_status();
            info!(
                subscription_id = %subscription.id,
                status = status.as_str(),
                "Subscription updated"
            );
            repo.sync_status(
                &subscription.id,
                status,
                subscription.period_start(),
                subscription.period_end(),
                subscription.trial_end(),
            )
            .await?;
        }

        PaymentEvent::SubscriptionDeleted(subscription) => {
            info!(subscription_id = %subscription.id, "Subscription deleted");
            repo.cancel_cascade(&subscription.id).await?;
        }

        PaymentEvent::Unknown(kind) => {
            info!(event_type = %kind, "Unhandled payment event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}
