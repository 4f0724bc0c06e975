//! Speech-agent provider client.
//!
//! Creates conversational agents, registers live calls against them and
//! fetches conversation transcripts.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use crate::ProviderError;

/// Agent creation parameters assembled by the provisioning workflow.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub voice_id: String,
    pub system_prompt: String,
    pub language: String,
    pub initial_message: String,
    /// Max seconds per conversational turn.
    pub turn_timeout_secs: u32,
    /// Max seconds per call.
    pub max_call_duration_secs: u32,
}

/// Identifiers assigned by the provider on agent creation.
#[derive(Debug, Clone)]
pub struct CreatedAgent {
    pub external_agent_id: String,
    /// Inbound-call webhook the telephony number must be pointed at.
    pub inbound_webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct RegisterCallRequest {
    pub external_agent_id: String,
    pub from_number: String,
    pub to_number: String,
    pub direction: String,
}

/// The provider answers a call registration in one of two useful shapes:
/// a complete voice-routing document, or a streaming endpoint the
/// telephony side must be connected to.
#[derive(Debug, Clone)]
pub enum CallRouting {
    Document(String),
    StreamUrl(String),
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn create_agent(&self, request: &CreateAgentRequest)
        -> Result<CreatedAgent, ProviderError>;

    /// Transcript of the agent's most recent conversation, if any.
    async fn latest_transcript(
        &self,
        external_agent_id: &str,
    ) -> Result<Option<String>, ProviderError>;

    async fn register_call(
        &self,
        request: &RegisterCallRequest,
    ) -> Result<CallRouting, ProviderError>;
}

pub struct HttpSpeechClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl HttpSpeechClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            api_key,
            http_client,
        }
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .http_client
            .get(url)
            .header("x-api-key", &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechClient {
    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<CreatedAgent, ProviderError> {
        let payload = json!({
            "name": request.name,
            "voice_id": request.voice_id,
            "prompt": { "system": request.system_prompt },
            "language": request.language,
            "conversation_config": {
                "turn_timeout": request.turn_timeout_secs,
                "max_duration": request.max_call_duration_secs,
                "initial_message": request.initial_message,
            }
        });

        let response = self
            .http_client
            .post(format!("{}/v1/agents", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let external_agent_id = result["agent_id"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("missing agent_id".to_string()))?
            .to_string();
        tracing::debug!(external_agent_id = %external_agent_id, "Speech agent created");
        let inbound_webhook_url = result["inbound_phone_call_webhook_url"]
            .as_str()
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing inbound webhook url".to_string())
            })?
            .to_string();

        Ok(CreatedAgent {
            external_agent_id,
            inbound_webhook_url,
        })
    }

    async fn latest_transcript(
        &self,
        external_agent_id: &str,
    ) -> Result<Option<String>, ProviderError> {
        let listing = self
            .get_json(format!(
                "{}/v1/conversations?agent_id={}&page_size=5",
                self.base_url, external_agent_id
            ))
            .await?;

        let conversation_id = match listing["conversations"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|c| c["conversation_id"].as_str())
        {
            Some(id) => id.to_string(),
            None => return Ok(None),
        };

        let detail = self
            .get_json(format!(
                "{}/v1/conversations/{}",
                self.base_url, conversation_id
            ))
            .await?;

        let transcript = detail["transcript"]
            .as_array()
            .map(|turns| {
                turns
                    .iter()
                    .map(|turn| {
                        format!(
                            "{}: {}",
                            turn["role"].as_str().unwrap_or("unknown"),
                            turn["message"].as_str().unwrap_or("")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|t| !t.is_empty());

        Ok(transcript)
    }

    async fn register_call(
        &self,
        request: &RegisterCallRequest,
    ) -> Result<CallRouting, ProviderError> {
        let payload = json!({
            "agent_id": request.external_agent_id,
            "from_number": request.from_number,
            "to_number": request.to_number,
            "direction": request.direction,
        });

        let response = self
            .http_client
            .post(format!("{}/v1/telephony/register-call", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        parse_call_routing(&body)
    }
}

/// The provider has answered register-call with three shapes over time:
/// a raw routing document, a wrapped document, and a streaming endpoint.
fn parse_call_routing(body: &str) -> Result<CallRouting, ProviderError> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(doc) = value.as_str() {
            return Ok(CallRouting::Document(doc.to_string()));
        }
        if let Some(doc) = value["document"].as_str().or(value["twiml"].as_str()) {
            return Ok(CallRouting::Document(doc.to_string()));
        }
        if let Some(url) = value["websocket_url"].as_str().or(value["stream_url"].as_str()) {
            return Ok(CallRouting::StreamUrl(url.to_string()));
        }
        return Err(ProviderError::InvalidResponse(
            "unrecognized register-call response".to_string(),
        ));
    }

    // Not JSON: the provider answered with the routing document itself.
    if body.trim_start().starts_with('<') {
        return Ok(CallRouting::Document(body.to_string()));
    }

    Err(ProviderError::InvalidResponse(
        "unrecognized register-call response".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_from_wrapped_document() {
        let routing = parse_call_routing(r#"{"twiml": "<Response/>"}"#).unwrap();
        assert!(matches!(routing, CallRouting::Document(d) if d == "<Response/>"));
    }

    #[test]
    fn routing_from_stream_url() {
        let routing = parse_call_routing(r#"{"websocket_url": "wss://x/stream"}"#).unwrap();
        assert!(matches!(routing, CallRouting::StreamUrl(u) if u == "wss://x/stream"));
    }

    #[test]
    fn routing_from_raw_document() {
        let routing = parse_call_routing("<Response><Say>hi</Say></Response>").unwrap();
        assert!(matches!(routing, CallRouting::Document(_)));
    }

    #[test]
    fn unrecognized_shape_is_an_error() {
        assert!(parse_call_routing(r#"{"unexpected": true}"#).is_err());
        assert!(parse_call_routing("plain text").is_err());
    }
}
