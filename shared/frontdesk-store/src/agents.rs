//! Agent repository.
//!
//! Provisioning owns agent rows while status is `deploying`; once an
//! agent is handed off, only webhook-driven handlers mutate its status.

use uuid::Uuid;

use crate::{Agent, AgentStatus, DeployStatus, Result, StorePool};

pub struct AgentRepository<'a> {
    db: &'a StorePool,
}

impl<'a> AgentRepository<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    /// Look up a single agent row regardless of status.
    pub async fn find_by_ids(
        &self,
        customer_id: Uuid,
        agent_id: Uuid,
    ) -> Result<Option<Agent>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT agent_id, customer_id, external_agent_id, voice_id, voice_name,
                        status, webhook_url, error_message, deployed_at, last_active_at
                 FROM agents
                 WHERE customer_id = $1 AND agent_id = $2",
                &[&customer_id, &agent_id],
            )
            .await?;

        Ok(row.map(|r| row_to_agent(&r)))
    }

    /// Persist the speech provider's identifiers after agent creation.
    pub async fn save_created(
        &self,
        agent_id: Uuid,
        external_agent_id: &str,
        webhook_url: &str,
        system_prompt: &str,
        conversation_config: &str,
    ) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE agents
                 SET external_agent_id = $1,
                     webhook_url = $2,
                     system_prompt = $3,
                     conversation_config = $4
                 WHERE agent_id = $5",
                &[
                    &external_agent_id,
                    &webhook_url,
                    &system_prompt,
                    &conversation_config,
                    &agent_id,
                ],
            )
            .await?;

        Ok(())
    }

    /// Mark the agent active. Only the final workflow stage flips an
    /// agent out of `deploying`.
    pub async fn mark_active(&self, agent_id: Uuid) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE agents
                 SET status = 'active',
                     error_message = NULL,
                     deployed_at = CURRENT_TIMESTAMP,
                     last_active_at = CURRENT_TIMESTAMP
                 WHERE agent_id = $1",
                &[&agent_id],
            )
            .await?;

        Ok(())
    }

    /// Record a terminal workflow failure. The agent stays in
    /// `deploying`; the stuck status plus the message is the operator's
    /// signal for manual remediation.
    pub async fn record_failure(&self, agent_id: Uuid, message: &str) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE agents SET error_message = $1 WHERE agent_id = $2",
                &[&message, &agent_id],
            )
            .await?;

        Ok(())
    }

    pub async fn touch_last_active(&self, agent_id: Uuid) -> Result<()> {
        let client = self.db.get().await?;

        client
            .execute(
                "UPDATE agents SET last_active_at = CURRENT_TIMESTAMP WHERE agent_id = $1",
                &[&agent_id],
            )
            .await?;

        Ok(())
    }

    /// Deployment status for the polling API, joined with the agent's
    /// phone number and knowledge-base progress.
    pub async fn deploy_status(&self, customer_id: Uuid) -> Result<Option<DeployStatus>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT a.agent_id, a.external_agent_id, a.status, a.error_message,
                        a.deployed_at, p.phone_number,
                        COALESCE(kb.docs_processed, 0) AS docs_processed
                 FROM agents a
                 LEFT JOIN phone_numbers p
                        ON p.agent_id = a.agent_id AND p.status = 'active'
                 LEFT JOIN knowledge_bases kb ON kb.customer_id = a.customer_id
                 WHERE a.customer_id = $1
                 ORDER BY a.created_at DESC
                 LIMIT 1",
                &[&customer_id],
            )
            .await?;

        Ok(row.map(|r| DeployStatus {
            status: r.get("status"),
            agent_id: Some(r.get("agent_id")),
            external_agent_id: r.get("external_agent_id"),
            phone_number: r.get("phone_number"),
            deployed_at: r.get("deployed_at"),
            error_message: r.get("error_message"),
            docs_processed: r.get("docs_processed"),
        }))
    }

    /// Newest active agent for a customer, for the outbound voice bridge.
    pub async fn find_active_for_customer(&self, customer_id: Uuid) -> Result<Option<Agent>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT agent_id, customer_id, external_agent_id, voice_id, voice_name,
                        status, webhook_url, error_message, deployed_at, last_active_at
                 FROM agents
                 WHERE customer_id = $1 AND status = 'active'
                 ORDER BY created_at DESC
                 LIMIT 1",
                &[&customer_id],
            )
            .await?;

        Ok(row.map(|r| row_to_agent(&r)))
    }

    /// The speech-provider id of the agent that took a test call.
    pub async fn external_id_for_test_call(&self, call_sid: &str) -> Result<Option<String>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT a.external_agent_id
                 FROM test_calls tc
                 JOIN agents a ON a.agent_id = tc.agent_id
                 WHERE tc.call_sid = $1",
                &[&call_sid],
            )
            .await?;

        Ok(row.and_then(|r| r.get("external_agent_id")))
    }
}

fn row_to_agent(row: &tokio_postgres::Row) -> Agent {
    let status: String = row.get("status");
    Agent {
        agent_id: row.get("agent_id"),
        customer_id: row.get("customer_id"),
        external_agent_id: row.get("external_agent_id"),
        voice_id: row.get("voice_id"),
        voice_name: row.get("voice_name"),
        status: AgentStatus::parse(&status).unwrap_or(AgentStatus::Inactive),
        webhook_url: row.get("webhook_url"),
        error_message: row.get("error_message"),
        deployed_at: row.get("deployed_at"),
        last_active_at: row.get("last_active_at"),
    }
}
