//! Test-call repository.
//!
//! Rows are keyed by the provider-assigned call_sid; webhook redelivery
//! re-applies the same update.

use crate::{Result, StorePool};

/// Fields a test-call status webhook may carry.
#[derive(Debug, Clone, Default)]
pub struct TestCallUpdate<'a> {
    pub status: &'a str,
    pub duration_seconds: Option<i32>,
    pub recording_url: Option<&'a str>,
    /// Terminal statuses stamp completed_at.
    pub terminal: bool,
}

pub struct TestCallRepository<'a> {
    db: &'a StorePool,
}

impl<'a> TestCallRepository<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    /// Apply a status update to the test call matched by call_sid.
    /// Returns false when no row matched (stale callback).
    pub async fn update_status(&self, call_sid: &str, update: TestCallUpdate<'_>) -> Result<bool> {
        let client = self.db.get().await?;

        let updated = client
            .execute(
                "UPDATE test_calls
                 SET status = $1,
                     duration_seconds = COALESCE($2, duration_seconds),
                     recording_url = COALESCE($3, recording_url),
                     completed_at = CASE WHEN $4 THEN COALESCE(completed_at, CURRENT_TIMESTAMP)
                                    ELSE completed_at END,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE call_sid = $5",
                &[
                    &update.status,
                    &update.duration_seconds,
                    &update.recording_url,
                    &update.terminal,
                    &call_sid,
                ],
            )
            .await?;

        Ok(updated > 0)
    }

    pub async fn save_transcript(&self, call_sid: &str, transcript: &str) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE test_calls SET transcript = $1 WHERE call_sid = $2",
                &[&transcript, &call_sid],
            )
            .await?;

        Ok(())
    }
}
