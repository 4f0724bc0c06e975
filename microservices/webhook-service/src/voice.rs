//! Outbound voice bridge.
//!
//! When the telephony provider places an outbound call and the callee
//! answers, it asks this endpoint what to do with the call. The answer
//! is a voice-routing document obtained by registering the call with
//! the customer's speech agent.
//!
//! This endpoint must always answer 200 with a routing document; a
//! non-document answer leaves the callee in dead air. Failures degrade
//! to a fixed apology-and-hangup document.

use axum::{
    extract::{OriginalUri, Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{error, info};
use uuid::Uuid;

use frontdesk_providers::speech::RegisterCallRequest;
use frontdesk_providers::CallRouting;
use frontdesk_store::agents::AgentRepository;

use crate::error::{Error, Result};
use crate::events::form_value;
use crate::telephony::verify;
use crate::AppState;

const FALLBACK_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say voice="alice" language="es-ES">Lo sentimos, ha ocurrido un error. Por favor, inténtelo de nuevo más tarde.</Say>
  <Hangup/>
</Response>"#;

pub async fn voice(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let params = verify(&state, &headers, uri.path(), &body)?;

    let from = form_value(&params, "From").unwrap_or("").to_string();
    let to = form_value(&params, "To").unwrap_or("").to_string();

    let document = match bridge_call(&state, customer_id, from, to).await {
        Ok(document) => document,
        Err(err) => {
            error!(customer_id = %customer_id, error = %err, "Voice bridge failed");
            FALLBACK_DOCUMENT.to_string()
        }
    };

    Ok(xml(document))
}

async fn bridge_call(
    state: &AppState,
    customer_id: Uuid,
    from: String,
    to: String,
) -> Result<String> {
    let agent = AgentRepository::new(&state.db)
        .find_active_for_customer(customer_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("no active agent for customer {}", customer_id)))?;

    let external_agent_id = agent
        .external_agent_id
        .ok_or_else(|| Error::Internal(format!("agent {} has no external id", agent.agent_id)))?;

    info!(
        customer_id = %customer_id,
        agent_id = %agent.agent_id,
        "Registering outbound call"
    );

    let request = RegisterCallRequest {
        external_agent_id,
        from_number: from,
        to_number: to,
        direction: "outbound".to_string(),
    };

    let routing = state.speech.register_call(&request).await?;

    Ok(match routing {
        CallRouting::Document(document) => document,
        CallRouting::StreamUrl(url) => stream_document(&url),
    })
}

/// Wrap a streaming endpoint in a routing document that connects the
/// live call to it.
fn stream_document(url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Response>\n  <Connect>\n    <Stream url=\"{}\" />\n  </Connect>\n</Response>",
        url
    )
}

fn xml(document: String) -> Response {
    Response::builder()
        .status(axum::http::StatusCode::OK)
        .header("Content-Type", "text/xml")
        .body(document.clone().into())
        .unwrap_or_else(|_| Response::new(document.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_document_embeds_url() {
        let doc = stream_document("wss://speech.example/stream/abc");
        assert!(doc.contains("<Connect>"));
        assert!(doc.contains("<Stream url=\"wss://speech.example/stream/abc\" />"));
    }

    #[test]
    fn fallback_apologizes_and_hangs_up() {
        assert!(FALLBACK_DOCUMENT.contains("<Say"));
        assert!(FALLBACK_DOCUMENT.contains("<Hangup/>"));
    }
}
