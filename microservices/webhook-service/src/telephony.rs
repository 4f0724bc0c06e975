//! Telephony webhook handlers: production call status and onboarding
//! test-call status.

use axum::{
    extract::{OriginalUri, Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{info, warn};
use uuid::Uuid;

use frontdesk_providers::signature::verify_telephony_signature;
use frontdesk_store::agents::AgentRepository;
use frontdesk_store::call_events::CallEventLog;
use frontdesk_store::phones::PhoneRepository;
use frontdesk_store::test_calls::{TestCallRepository, TestCallUpdate};

use crate::error::{Error, Result};
use crate::events::{parse_form, CallStatus, CallStatusEvent};
use crate::usage::{submit_usage, UsageReport};
use crate::AppState;

const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Outcome of the best-effort transcript capture after a test call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptOutcome {
    /// Transcript fetched and saved.
    Complete,
    /// Call data saved, transcript unavailable. Never fails the webhook.
    Partial,
}

/// Production call lifecycle callback.
///
/// Appends the raw event to the call log, and on completion reports the
/// call's usage to billing and refreshes the agent's activity stamp.
pub async fn call_status(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let params = verify(&state, &headers, uri.path(), &body)?;

    let event = CallStatusEvent::from_params(&params)
        .ok_or_else(|| Error::InvalidRequest("missing CallSid or CallStatus".to_string()))?;

    CallEventLog::new(&state.db)
        .append(&event.call_sid, &event.raw_status, &body)
        .await?;

    let owner = PhoneRepository::new(&state.db)
        .find_owner(event.provisioned_number())
        .await?;

    // Stale or reassigned numbers produce events nobody owns. Log and
    // acknowledge so the provider stops redelivering.
    let Some(owner) = owner else {
        warn!(
            call_sid = %event.call_sid,
            number = event.provisioned_number(),
            "No agent owns this number, dropping event"
        );
        return Ok(xml_ok());
    };

    if event.status == CallStatus::Completed {
        if let Some(duration) = event.duration_seconds {
            let report = UsageReport {
                customer_id: owner.customer_id,
                agent_id: owner.agent_id,
                call_sid: event.call_sid.clone(),
                duration_seconds: duration,
                caller_number: Some(event.caller_number().to_string()),
                direction: Some(event.direction.clone()),
                recording_url: event.recording_url.clone(),
            };
            submit_usage(&state, &report).await?;

            AgentRepository::new(&state.db)
                .touch_last_active(owner.agent_id)
                .await?;
        }
    }

    Ok(xml_ok())
}

/// Onboarding test-call callback, scoped to a customer.
pub async fn test_call_status(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let params = verify(&state, &headers, uri.path(), &body)?;

    let event = CallStatusEvent::from_params(&params)
        .ok_or_else(|| Error::InvalidRequest("missing CallSid or CallStatus".to_string()))?;

    info!(
        customer_id = %customer_id,
        call_sid = %event.call_sid,
        status = %event.raw_status,
        "Test call status"
    );

    let update = TestCallUpdate {
        status: &event.raw_status,
        duration_seconds: event.duration_seconds,
        recording_url: event.recording_url.as_deref(),
        terminal: event.status.is_terminal(),
    };

    let matched = TestCallRepository::new(&state.db)
        .update_status(&event.call_sid, update)
        .await?;

    if !matched {
        warn!(call_sid = %event.call_sid, "Callback for unknown test call");
        return Ok(xml_ok());
    }

    if event.status == CallStatus::Completed {
        let outcome = capture_transcript(&state, &event.call_sid).await;
        info!(call_sid = %event.call_sid, outcome = ?outcome, "Transcript capture finished");
    }

    Ok(xml_ok())
}

/// Fetch and store the transcript of a just-completed test call.
/// Every failure path degrades to [`TranscriptOutcome::Partial`].
async fn capture_transcript(state: &AppState, call_sid: &str) -> TranscriptOutcome {
    let external_id = match AgentRepository::new(&state.db)
        .external_id_for_test_call(call_sid)
        .await
    {
        Ok(Some(id)) => id,
        Ok(None) => {
            warn!(call_sid = %call_sid, "Test call agent has no external id yet");
            return TranscriptOutcome::Partial;
        }
        Err(err) => {
            warn!(call_sid = %call_sid, error = %err, "Agent lookup failed");
            return TranscriptOutcome::Partial;
        }
    };

    let transcript = match state.speech.latest_transcript(&external_id).await {
        Ok(Some(t)) => t,
        Ok(None) => {
            info!(call_sid = %call_sid, "No conversation recorded yet");
            return TranscriptOutcome::Partial;
        }
        Err(err) => {
            warn!(call_sid = %call_sid, error = %err, "Transcript fetch failed");
            return TranscriptOutcome::Partial;
        }
    };

    match TestCallRepository::new(&state.db)
        .save_transcript(call_sid, &transcript)
        .await
    {
        Ok(()) => TranscriptOutcome::Complete,
        Err(err) => {
            warn!(call_sid = %call_sid, error = %err, "Transcript save failed");
            TranscriptOutcome::Partial
        }
    }
}

/// Validate the provider signature over the full public callback URL
/// and the decoded form parameters, returning the parameters on
/// success. An invalid signature mutates nothing.
pub(crate) fn verify(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    body: &str,
) -> Result<Vec<(String, String)>> {
    let params = parse_form(body);

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let url = format!("{}{}", state.config.api_base_url, path);

    if !verify_telephony_signature(&state.secrets.telephony_auth_token, signature, &url, &params) {
        warn!(path = path, "Telephony signature validation failed");
        return Err(Error::InvalidSignature);
    }

    Ok(params)
}

/// Minimal acknowledgement document the telephony provider expects.
pub(crate) fn xml_ok() -> Response {
    Response::builder()
        .status(axum::http::StatusCode::OK)
        .header("Content-Type", "text/xml")
        .body("<Response/>".into())
        .unwrap_or_else(|_| Response::new("<Response/>".into()))
}
