//! Subscription repository.
//!
//! Subscription rows are mutated exclusively by payment-provider webhook
//! events. Multi-table updates (billing health flipping agent
//! availability) run inside a single transaction so a redelivered event
//! can never observe a partial update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Result, StorePool, Subscription, SubscriptionStatus};

pub struct SubscriptionRepository<'a> {
    db: &'a StorePool,
}

impl<'a> SubscriptionRepository<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    /// The customer's newest subscription in a billable state.
    pub async fn find_billable(&self, customer_id: Uuid) -> Result<Option<Subscription>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT subscription_id, customer_id, provider_subscription_id,
                        provider_customer_id, plan_tier, minutes_included, status,
                        current_period_start, current_period_end
                 FROM subscriptions
                 WHERE customer_id = $1 AND status IN ('active', 'trialing')
                 ORDER BY created_at DESC
                 LIMIT 1",
                &[&customer_id],
            )
            .await?;

        Ok(row.map(|r| row_to_subscription(&r)))
    }

    /// Total minutes recorded against the current billing period.
    pub async fn minutes_used(
        &self,
        customer_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Decimal> {
        let client = self.db.get().await?;

        let row = client
            .query_one(
                "SELECT COALESCE(SUM(quantity), 0) AS total
                 FROM usage_records
                 WHERE customer_id = $1
                   AND billing_period_start = $2
                   AND billing_period_end = $3",
                &[&customer_id, &period_start, &period_end],
            )
            .await?;

        Ok(row.get("total"))
    }

    /// Payment succeeded: confirm the subscription active and refresh
    /// its billing period bounds. Idempotent - replaying the event sets
    /// the same values again.
    pub async fn activate_with_period(
        &self,
        provider_subscription_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE subscriptions
                 SET status = 'active',
                     current_period_start = $1,
                     current_period_end = $2
                 WHERE provider_subscription_id = $3",
                &[&period_start, &period_end, &provider_subscription_id],
            )
            .await?;

        Ok(())
    }

    /// Payment failed: subscription goes past_due and the owning agent
    /// stops answering calls, as one logical operation.
    pub async fn mark_past_due_and_pause(&self, provider_subscription_id: &str) -> Result<()> {
        let mut client = self.db.get().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE subscriptions SET status = 'past_due'
             WHERE provider_subscription_id = $1",
            &[&provider_subscription_id],
        )
        .await?;

        tx.execute(
            "UPDATE agents SET status = 'inactive'
             WHERE customer_id = (
                SELECT customer_id FROM subscriptions
                WHERE provider_subscription_id = $1
             )",
            &[&provider_subscription_id],
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Subscription updated: sync the mapped status and period bounds.
    /// When the new status is billable again, re-activate only agents
    /// that are currently inactive - idempotent "set to X" semantics, so
    /// out-of-order delivery is harmless.
    pub async fn sync_status(
        &self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        trial_end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut client = self.db.get().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE subscriptions
             SET status = $1,
                 current_period_start = $2,
                 current_period_end = $3,
                 trial_end = $4
             WHERE provider_subscription_id = $5",
            &[
                &status.as_str(),
                &period_start,
                &period_end,
                &trial_end,
                &provider_subscription_id,
            ],
        )
        .await?;

        if status.is_billable() {
            tx.execute(
                "UPDATE agents SET status = 'active'
                 WHERE customer_id = (
                    SELECT customer_id FROM subscriptions
                    WHERE provider_subscription_id = $1
                 ) AND status = 'inactive'",
                &[&provider_subscription_id],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Subscription deleted: terminal cascade - subscription, agent and
    /// customer, in that order, within one transaction.
    pub async fn cancel_cascade(&self, provider_subscription_id: &str) -> Result<()> {
        let mut client = self.db.get().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE subscriptions SET status = 'cancelled'
             WHERE provider_subscription_id = $1",
            &[&provider_subscription_id],
        )
        .await?;

        tx.execute(
            "UPDATE agents SET status = 'inactive'
             WHERE customer_id = (
                SELECT customer_id FROM subscriptions
                WHERE provider_subscription_id = $1
             )",
            &[&provider_subscription_id],
        )
        .await?;

        tx.execute(
            "UPDATE customers SET status = 'cancelled'
             WHERE customer_id = (
                SELECT customer_id FROM subscriptions
                WHERE provider_subscription_id = $1
             )",
            &[&provider_subscription_id],
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_subscription(row: &tokio_postgres::Row) -> Subscription {
    let status: String = row.get("status");
    Subscription {
        subscription_id: row.get("subscription_id"),
        customer_id: row.get("customer_id"),
        provider_subscription_id: row.get("provider_subscription_id"),
        provider_customer_id: row.get("provider_customer_id"),
        plan_tier: row.get("plan_tier"),
        minutes_included: row.get("minutes_included"),
        status: parse_status(&status),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
    }
}

fn parse_status(s: &str) -> SubscriptionStatus {
    match s {
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" => SubscriptionStatus::PastDue,
        "cancelled" => SubscriptionStatus::Cancelled,
        "unpaid" => SubscriptionStatus::Unpaid,
        _ => SubscriptionStatus::Active,
    }
}
