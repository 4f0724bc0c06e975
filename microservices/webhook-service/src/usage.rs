//! Usage ingest client.
//!
//! Completed production calls are handed to the billing service over
//! HTTP. The ingest endpoint is idempotent on call_sid, so the write is
//! retried under the idempotent-write policy.

use serde::Serialize;

use frontdesk_core::{retry, RetryPolicy};
use frontdesk_providers::ProviderError;

use crate::error::Result;
use crate::AppState;

/// One completed call, as reported to the billing service.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub customer_id: uuid::Uuid,
    pub agent_id: uuid::Uuid,
    pub call_sid: String,
    pub duration_seconds: i32,
    pub caller_number: Option<String>,
    pub direction: Option<String>,
    pub recording_url: Option<String>,
}

pub async fn submit_usage(state: &AppState, report: &UsageReport) -> Result<()> {
    let url = format!("{}/v1/usage/record", state.config.billing_base_url);

    retry(&RetryPolicy::idempotent_write(), || async {
        let response = state
            .http
            .post(&url)
            .json(report)
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }
        Ok(())
    })
    .await?;

    tracing::info!(
        call_sid = %report.call_sid,
        duration_seconds = report.duration_seconds,
        "Usage reported to billing"
    );
    Ok(())
}
