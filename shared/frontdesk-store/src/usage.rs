//! Usage record repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Result, StorePool};

/// A usage line ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub call_sid: String,
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
}

/// Outcome of an idempotent usage insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageInsert {
    /// A new row was written.
    Created(Uuid),
    /// A row for this call_sid already existed; nothing was written.
    Duplicate(Uuid),
}

impl UsageInsert {
    pub fn usage_id(&self) -> Uuid {
        match self {
            Self::Created(id) | Self::Duplicate(id) => *id,
        }
    }
}

pub struct UsageRepository<'a> {
    db: &'a StorePool,
}

impl<'a> UsageRepository<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    /// Insert one usage line. call_sid is unique; a redelivered webhook
    /// replays the same call, so a conflicting insert writes nothing
    /// and surfaces the existing row instead.
    pub async fn insert(&self, record: NewUsageRecord) -> Result<UsageInsert> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "INSERT INTO usage_records (
                    usage_id, subscription_id, customer_id, agent_id,
                    usage_type, quantity, unit_price, total_cost,
                    call_sid, billing_period_start, billing_period_end
                 ) VALUES ($1, $2, $3, $4, 'call_minutes', $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (call_sid) DO NOTHING
                 RETURNING usage_id",
                &[
                    &Uuid::new_v4(),
                    &record.subscription_id,
                    &record.customer_id,
                    &record.agent_id,
                    &record.quantity,
                    &record.unit_price,
                    &record.total_cost,
                    &record.call_sid,
                    &record.billing_period_start,
                    &record.billing_period_end,
                ],
            )
            .await?;

        if let Some(row) = row {
            return Ok(UsageInsert::Created(row.get("usage_id")));
        }

        let existing = client
            .query_one(
                "SELECT usage_id FROM usage_records WHERE call_sid = $1",
                &[&record.call_sid],
            )
            .await?;

        Ok(UsageInsert::Duplicate(existing.get("usage_id")))
    }

    /// Stamp the payment provider's usage-record id after a successful
    /// metered-billing report.
    pub async fn set_provider_record_id(&self, usage_id: Uuid, provider_id: &str) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE usage_records SET provider_usage_record_id = $1 WHERE usage_id = $2",
                &[&provider_id, &usage_id],
            )
            .await?;

        Ok(())
    }
}
