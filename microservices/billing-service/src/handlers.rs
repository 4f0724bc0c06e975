//! HTTP handlers for the billing service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use frontdesk_core::{retry, RetryPolicy};
use frontdesk_store::subscriptions::SubscriptionRepository;
use frontdesk_store::usage::{NewUsageRecord, UsageInsert, UsageRepository};
use frontdesk_store::Subscription;

use crate::error::{Error, Result};
use crate::reconciler::{
    billable_overage_units, compute_usage, is_billable_duration, UsageComputation,
};
use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "billing-service"
    }))
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.is_healthy().await {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false })),
        )
    }
}

/// One completed call, as delivered by the webhook service.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageIngest {
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub call_sid: String,
    pub duration_seconds: i32,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// Record one completed call's usage and, when it produces overage,
/// report it to the payment provider's metered billing.
///
/// Skipped calls (too short, no billable subscription) are still
/// acknowledged with 200 so the caller stops retrying.
pub async fn record_usage(
    State(state): State<AppState>,
    Json(ingest): Json<UsageIngest>,
) -> Result<Json<Value>> {
    info!(
        call_sid = %ingest.call_sid,
        customer_id = %ingest.customer_id,
        duration_seconds = ingest.duration_seconds,
        "Processing usage"
    );

    if !is_billable_duration(ingest.duration_seconds) {
        info!(call_sid = %ingest.call_sid, "Skipping short call");
        return Ok(Json(json!({ "recorded": false, "reason": "short_call" })));
    }

    let subscriptions = SubscriptionRepository::new(&state.db);
    let Some(subscription) = subscriptions.find_billable(ingest.customer_id).await? else {
        warn!(customer_id = %ingest.customer_id, "No billable subscription, skipping");
        return Ok(Json(json!({ "recorded": false, "reason": "no_subscription" })));
    };

    let minutes_used = subscriptions
        .minutes_used(
            ingest.customer_id,
            subscription.current_period_start,
            subscription.current_period_end,
        )
        .await?;

    let usage = compute_usage(
        ingest.duration_seconds,
        minutes_used,
        subscription.minutes_included,
        state.config.overage_price_per_minute,
    );

    let inserted = UsageRepository::new(&state.db)
        .insert(NewUsageRecord {
            subscription_id: subscription.subscription_id,
            customer_id: ingest.customer_id,
            agent_id: ingest.agent_id,
            quantity: usage.quantity_minutes,
            unit_price: usage.unit_price,
            total_cost: usage.total_cost,
            call_sid: ingest.call_sid.clone(),
            billing_period_start: subscription.current_period_start,
            billing_period_end: subscription.current_period_end,
        })
        .await?;

    info!(
        usage_id = %inserted.usage_id(),
        quantity_minutes = %usage.quantity_minutes,
        overage_minutes = %usage.overage_minutes,
        total_cost = %usage.total_cost,
        duplicate = matches!(inserted, UsageInsert::Duplicate(_)),
        "Usage processed"
    );

    let (report_for, body) = settle_ingest(inserted, &usage);
    if let Some(usage_id) = report_for {
        report_overage(&state, &subscription, usage.overage_minutes, usage_id).await;
    }

    Ok(Json(body))
}

/// Turn the insert outcome into a response body and, for a fresh row
/// with overage, the usage id to report to the payment provider. A
/// replayed call never reaches the provider a second time.
fn settle_ingest(inserted: UsageInsert, usage: &UsageComputation) -> (Option<Uuid>, Value) {
    match inserted {
        UsageInsert::Duplicate(usage_id) => (
            None,
            json!({
                "recorded": false,
                "reason": "duplicate",
                "usage_id": usage_id
            }),
        ),
        UsageInsert::Created(usage_id) => {
            let report_for = (usage.overage_minutes > Decimal::ZERO).then_some(usage_id);
            (
                report_for,
                json!({
                    "recorded": true,
                    "usage_id": usage_id,
                    "quantity_minutes": usage.quantity_minutes,
                    "overage_minutes": usage.overage_minutes,
                    "total_cost": usage.total_cost
                }),
            )
        }
    }
}

/// Report overage to the payment provider's metered billing. Reporting
/// is best-effort; the usage row already holds the authoritative
/// record, so provider failures are logged, not surfaced.
async fn report_overage(
    state: &AppState,
    subscription: &Subscription,
    overage_minutes: Decimal,
    usage_id: Uuid,
) {
    let quantity = billable_overage_units(overage_minutes);
    if quantity == 0 {
        return;
    }

    let metered_item = retry(&RetryPolicy::external_api(), || {
        state
            .payment
            .metered_item(&subscription.provider_subscription_id)
    })
    .await;

    let item_id = match metered_item {
        Ok(Some(item_id)) => item_id,
        Ok(None) => {
            error!(
                subscription_id = %subscription.provider_subscription_id,
                "Cannot report overage, subscription has no metered item"
            );
            return;
        }
        Err(err) => {
            error!(error = %err, "Metered item lookup failed");
            return;
        }
    };

    match retry(&RetryPolicy::external_api(), || {
        state.payment.report_usage(&item_id, quantity)
    })
    .await
    {
        Ok(provider_record_id) => {
            info!(
                usage_id = %usage_id,
                quantity = quantity,
                provider_record_id = %provider_record_id,
                "Overage reported"
            );
            if let Err(err) = UsageRepository::new(&state.db)
                .set_provider_record_id(usage_id, &provider_record_id)
                .await
            {
                error!(usage_id = %usage_id, error = %err, "Failed to stamp provider record id");
            }
        }
        Err(err) => {
            error!(usage_id = %usage_id, error = %err, "Overage reporting failed");
        }
    }
}

/// Current-period usage summary for dashboards.
pub async fn usage_summary(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let subscriptions = SubscriptionRepository::new(&state.db);
    let subscription = subscriptions
        .find_billable(customer_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no billable subscription for {}", customer_id)))?;

    let minutes_used = subscriptions
        .minutes_used(
            customer_id,
            subscription.current_period_start,
            subscription.current_period_end,
        )
        .await?;

    let included = Decimal::from(subscription.minutes_included);
    let minutes_remaining = (included - minutes_used).max(Decimal::ZERO);
    let overage_minutes = (minutes_used - included).max(Decimal::ZERO);

    Ok(Json(json!({
        "customer_id": customer_id,
        "plan_tier": subscription.plan_tier,
        "status": subscription.status,
        "minutes_included": subscription.minutes_included,
        "minutes_used": minutes_used,
        "minutes_remaining": minutes_remaining,
        "overage_minutes": overage_minutes,
        "current_period_start": subscription.current_period_start,
        "current_period_end": subscription.current_period_end
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PRICE: Decimal = dec!(0.15);

    #[test]
    fn fresh_overage_row_is_reported() {
        let usage = compute_usage(187, dec!(150), 100, PRICE);
        let usage_id = Uuid::new_v4();

        let (report_for, body) = settle_ingest(UsageInsert::Created(usage_id), &usage);

        assert_eq!(report_for, Some(usage_id));
        assert_eq!(body["recorded"], json!(true));
        assert_eq!(body["usage_id"], json!(usage_id));
    }

    #[test]
    fn fresh_row_without_overage_is_not_reported() {
        let usage = compute_usage(120, dec!(50), 100, PRICE);
        let usage_id = Uuid::new_v4();

        let (report_for, body) = settle_ingest(UsageInsert::Created(usage_id), &usage);

        assert_eq!(report_for, None);
        assert_eq!(body["recorded"], json!(true));
    }

    #[test]
    fn replayed_call_is_acknowledged_without_a_second_report() {
        // A redelivered webhook re-runs the whole ingest path. The
        // insert surfaces the existing row; nothing new reaches the
        // payment provider and the response names the original row.
        let original_id = Uuid::new_v4();
        let first = compute_usage(187, dec!(150), 100, PRICE);
        let (first_report, first_body) = settle_ingest(UsageInsert::Created(original_id), &first);
        assert_eq!(first_report, Some(original_id));
        assert_eq!(first_body["recorded"], json!(true));

        // On replay the period's minutes_used already includes the
        // first row, so the recomputed quantities differ; they are
        // discarded along with the insert.
        let replay = compute_usage(187, dec!(153.117), 100, PRICE);
        let (replay_report, replay_body) =
            settle_ingest(UsageInsert::Duplicate(original_id), &replay);

        assert_eq!(replay_report, None);
        assert_eq!(replay_body["recorded"], json!(false));
        assert_eq!(replay_body["reason"], json!("duplicate"));
        assert_eq!(replay_body["usage_id"], json!(original_id));
    }
}
