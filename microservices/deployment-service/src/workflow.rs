//! Provisioning workflow.
//!
//! Four sequential stages turn a `deploying` agent row into a live,
//! phone-reachable voice agent. The context only ever gains fields as
//! stages complete; no stage mutates what an earlier stage produced.
//!
//! There is no compensation path. A failed stage records its error on
//! the agent row and leaves the agent in `deploying` for an operator to
//! re-trigger; numbers purchased by an earlier stage stay purchased.

use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use frontdesk_core::{retry, RetryPolicy};
use frontdesk_providers::speech::CreateAgentRequest;
use frontdesk_providers::telephony::PurchaseRequest;
use frontdesk_store::agents::AgentRepository;
use frontdesk_store::phones::PhoneRepository;

use crate::error::{Error, Result};
use crate::prompt::{self, BusinessProfile, KnowledgeBaseInput};
use crate::AppState;

/// Seconds per conversational turn before the agent prompts again.
const TURN_TIMEOUT_SECS: u32 = 10;
/// Hard cap on call length.
const MAX_CALL_DURATION_SECS: u32 = 1800;
const NUMBER_SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    CreateAgent,
    ProvisionNumber,
    LinkNumber,
    Finalize,
}

impl DeployStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateAgent => "create_agent",
            Self::ProvisionNumber => "provision_number",
            Self::LinkNumber => "link_number",
            Self::Finalize => "finalize",
        }
    }

    const ALL: [DeployStage; 4] = [
        Self::CreateAgent,
        Self::ProvisionNumber,
        Self::LinkNumber,
        Self::Finalize,
    ];
}

/// Trigger payload accepted by `POST /deploy`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub voice_id: String,
    pub voice_name: String,
    pub business_profile: BusinessProfile,
    #[serde(default)]
    pub knowledge_base: Option<KnowledgeBaseInput>,
}

/// Accumulated workflow state. Stages append, never overwrite.
#[derive(Debug, Default)]
pub struct DeployContext {
    pub external_agent_id: Option<String>,
    pub webhook_url: Option<String>,
    pub phone_number: Option<String>,
    pub provider_sid: Option<String>,
    pub phone_id: Option<Uuid>,
}

/// Run all stages to completion. On the first stage failure the error
/// is written to the agent row and the execution stops; the agent stays
/// in `deploying`.
pub async fn run_deployment(state: AppState, request: DeployRequest) {
    let agent_id = request.agent_id;
    let mut ctx = DeployContext::default();

    for stage in DeployStage::ALL {
        info!(
            agent_id = %agent_id,
            customer_id = %request.customer_id,
            stage = stage.as_str(),
            "Running deployment stage"
        );

        if let Err(err) = run_stage(stage, &state, &request, &mut ctx).await {
            error!(
                agent_id = %agent_id,
                stage = stage.as_str(),
                error = %err,
                "Deployment failed"
            );
            let message = format!("{}: {}", stage.as_str(), err);
            if let Err(store_err) = AgentRepository::new(&state.db)
                .record_failure(agent_id, &message)
                .await
            {
                error!(agent_id = %agent_id, error = %store_err, "Failed to record deployment error");
            }
            return;
        }
    }

    info!(
        agent_id = %agent_id,
        phone_number = ctx.phone_number.as_deref().unwrap_or(""),
        "Deployment complete"
    );
}

async fn run_stage(
    stage: DeployStage,
    state: &AppState,
    request: &DeployRequest,
    ctx: &mut DeployContext,
) -> Result<()> {
    match stage {
        DeployStage::CreateAgent => create_agent(state, request, ctx).await,
        DeployStage::ProvisionNumber => provision_number(state, request, ctx).await,
        DeployStage::LinkNumber => link_number(state, request, ctx).await,
        DeployStage::Finalize => finalize(state, request).await,
    }
}

/// Stage 1: create the conversational agent at the speech provider and
/// persist its identifiers.
async fn create_agent(
    state: &AppState,
    request: &DeployRequest,
    ctx: &mut DeployContext,
) -> Result<()> {
    let system_prompt =
        prompt::build_system_prompt(&request.business_profile, request.knowledge_base.as_ref());

    let create_request = CreateAgentRequest {
        name: prompt::agent_display_name(&request.business_profile),
        voice_id: request.voice_id.clone(),
        system_prompt: system_prompt.clone(),
        language: state.config.agent_language.clone(),
        initial_message: prompt::initial_message(&request.business_profile),
        turn_timeout_secs: TURN_TIMEOUT_SECS,
        max_call_duration_secs: MAX_CALL_DURATION_SECS,
    };

    let created = retry(&RetryPolicy::external_api(), || {
        state.speech.create_agent(&create_request)
    })
    .await?;

    let conversation_config = serde_json::json!({
        "turn_timeout": TURN_TIMEOUT_SECS,
        "max_duration": MAX_CALL_DURATION_SECS,
    })
    .to_string();

    AgentRepository::new(&state.db)
        .save_created(
            request.agent_id,
            &created.external_agent_id,
            &created.inbound_webhook_url,
            &system_prompt,
            &conversation_config,
        )
        .await?;

    ctx.external_agent_id = Some(created.external_agent_id);
    ctx.webhook_url = Some(created.inbound_webhook_url);
    Ok(())
}

/// Stage 2: purchase a voice-capable number wired to the agent's
/// webhook, and record it as the agent's active number.
async fn provision_number(
    state: &AppState,
    request: &DeployRequest,
    ctx: &mut DeployContext,
) -> Result<()> {
    let webhook_url = ctx
        .webhook_url
        .clone()
        .ok_or_else(|| Error::Internal("provision_number before create_agent".to_string()))?;

    let country = &state.config.number_country;
    let available = retry(&RetryPolicy::external_api(), || {
        state.telephony.search_numbers(country, NUMBER_SEARCH_LIMIT)
    })
    .await?;

    let candidate = pick_number(&available, country)?;

    let purchase = PurchaseRequest {
        phone_number: candidate.to_string(),
        friendly_name: format!("Frontdesk - {}", request.customer_id),
        voice_url: webhook_url,
        status_callback_url: format!(
            "{}/webhooks/telephony/call-status",
            state.config.api_base_url
        ),
    };

    let purchased = retry(&RetryPolicy::external_api(), || {
        state.telephony.purchase_number(&purchase)
    })
    .await?;

    let phone_id = PhoneRepository::new(&state.db)
        .insert(
            request.customer_id,
            request.agent_id,
            &purchased.phone_number,
            &purchased.number_sid,
            &state.config.number_country_prefix,
        )
        .await?;

    ctx.phone_number = Some(purchased.phone_number);
    ctx.provider_sid = Some(purchased.number_sid);
    ctx.phone_id = Some(phone_id);
    Ok(())
}

/// An empty inventory is a business failure, not a transient one. It is
/// surfaced without retry so the operator can pick another country.
fn pick_number<'a>(available: &'a [String], country: &str) -> Result<&'a str> {
    available
        .first()
        .map(String::as_str)
        .ok_or_else(|| Error::NoNumbersAvailable(country.to_string()))
}

/// Stage 3: verify the number row is active and bound to this agent.
/// Pure consistency gate; fails closed.
async fn link_number(state: &AppState, request: &DeployRequest, ctx: &mut DeployContext) -> Result<()> {
    let phone_id = ctx
        .phone_id
        .ok_or_else(|| Error::Internal("link_number before provision_number".to_string()))?;

    let linked = PhoneRepository::new(&state.db)
        .verify_active_link(phone_id, request.agent_id)
        .await?;

    if !linked {
        return Err(Error::PhoneNotLinked(phone_id, request.agent_id));
    }
    Ok(())
}

/// Stage 4: the only place an agent leaves `deploying`.
async fn finalize(state: &AppState, request: &DeployRequest) -> Result<()> {
    AgentRepository::new(&state.db)
        .mark_active(request.agent_id)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_providers::speech::{CallRouting, CreatedAgent, RegisterCallRequest, SpeechProvider};
    use frontdesk_providers::ProviderError;
    use std::result::Result;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn stages_run_in_provisioning_order() {
        let labels: Vec<&str> = DeployStage::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            vec!["create_agent", "provision_number", "link_number", "finalize"]
        );
    }

    #[test]
    fn empty_inventory_is_a_permanent_failure() {
        let err = pick_number(&[], "ES").unwrap_err();
        assert!(matches!(err, Error::NoNumbersAvailable(c) if c == "ES"));

        let numbers = vec!["+34911000111".to_string(), "+34911000222".to_string()];
        assert_eq!(pick_number(&numbers, "ES").unwrap(), "+34911000111");
    }

    /// Speech provider that fails a configurable number of times with a
    /// 503 before succeeding.
    struct FlakySpeech {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SpeechProvider for FlakySpeech {
        async fn create_agent(
            &self,
            _request: &CreateAgentRequest,
        ) -> Result<CreatedAgent, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ProviderError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            Ok(CreatedAgent {
                external_agent_id: "agent_ext_1".to_string(),
                inbound_webhook_url: "https://speech.example/hook/agent_ext_1".to_string(),
            })
        }

        async fn latest_transcript(
            &self,
            _external_agent_id: &str,
        ) -> Result<Option<String>, ProviderError> {
            Ok(None)
        }

        async fn register_call(
            &self,
            _request: &RegisterCallRequest,
        ) -> Result<CallRouting, ProviderError> {
            Err(ProviderError::InvalidResponse("not under test".to_string()))
        }
    }

    fn create_request() -> CreateAgentRequest {
        CreateAgentRequest {
            name: "Test - Recepcionista".to_string(),
            voice_id: "voice1".to_string(),
            system_prompt: "prompt".to_string(),
            language: "es".to_string(),
            initial_message: "Hola".to_string(),
            turn_timeout_secs: TURN_TIMEOUT_SECS,
            max_call_duration_secs: MAX_CALL_DURATION_SECS,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn agent_creation_survives_transient_provider_failures() {
        let speech = FlakySpeech {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::external_api()
        };
        let request = create_request();

        let created = retry(&policy, || speech.create_agent(&request)).await.unwrap();
        assert_eq!(created.external_agent_id, "agent_ext_1");
        assert_eq!(speech.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn agent_creation_does_not_retry_client_errors() {
        struct Rejecting {
            calls: AtomicU32,
        }

        #[async_trait]
        impl SpeechProvider for Rejecting {
            async fn create_agent(
                &self,
                _request: &CreateAgentRequest,
            ) -> Result<CreatedAgent, ProviderError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Api {
                    status: 422,
                    message: "bad voice_id".to_string(),
                })
            }

            async fn latest_transcript(
                &self,
                _external_agent_id: &str,
            ) -> Result<Option<String>, ProviderError> {
                Ok(None)
            }

            async fn register_call(
                &self,
                _request: &RegisterCallRequest,
            ) -> Result<CallRouting, ProviderError> {
                Err(ProviderError::InvalidResponse("not under test".to_string()))
            }
        }

        let speech = Rejecting {
            calls: AtomicU32::new(0),
        };
        let request = create_request();

        let result = retry(&RetryPolicy::external_api(), || {
            speech.create_agent(&request)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
    }
}
