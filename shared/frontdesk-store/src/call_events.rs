//! Append-only raw call-event log.
//!
//! Every telephony status callback is appended here as received. The
//! workflow never reads these rows back; they exist for analytics.

use crate::{Result, StorePool};

pub struct CallEventLog<'a> {
    db: &'a StorePool,
}

impl<'a> CallEventLog<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    pub async fn append(&self, call_sid: &str, status: &str, payload: &str) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "INSERT INTO call_events (call_sid, status, payload, received_at)
                 VALUES ($1, $2, $3, CURRENT_TIMESTAMP)",
                &[&call_sid, &status, &payload],
            )
            .await?;

        Ok(())
    }
}
