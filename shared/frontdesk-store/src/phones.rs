//! Phone number repository.
//!
//! Invariant: at most one row with status = 'active' per agent.

use uuid::Uuid;

use crate::{NumberOwner, PhoneStatus, Result, StorePool};

pub struct PhoneRepository<'a> {
    db: &'a StorePool,
}

impl<'a> PhoneRepository<'a> {
    pub fn new(db: &'a StorePool) -> Self {
        Self { db }
    }

    /// Insert a freshly purchased number, returning the new phone_id.
    pub async fn insert(
        &self,
        customer_id: Uuid,
        agent_id: Uuid,
        phone_number: &str,
        provider_sid: &str,
        country_code: &str,
    ) -> Result<Uuid> {
        let client = self.db.get().await?;

        let row = client
            .query_one(
                "INSERT INTO phone_numbers (
                    phone_id, customer_id, agent_id, phone_number,
                    provider_sid, country_code, status
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING phone_id",
                &[
                    &Uuid::new_v4(),
                    &customer_id,
                    &agent_id,
                    &phone_number,
                    &provider_sid,
                    &country_code,
                    &PhoneStatus::Active.as_str(),
                ],
            )
            .await?;

        Ok(row.get("phone_id"))
    }

    /// Verify the purchased number is visible, active and bound to the
    /// expected agent. The link stage fails closed when this is false.
    pub async fn verify_active_link(&self, phone_id: Uuid, agent_id: Uuid) -> Result<bool> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT phone_id FROM phone_numbers
                 WHERE phone_id = $1 AND agent_id = $2 AND status = $3",
                &[&phone_id, &agent_id, &PhoneStatus::Active.as_str()],
            )
            .await?;

        Ok(row.is_some())
    }

    /// Resolve the agent owning a provisioned number. Returns None for
    /// stale or reassigned numbers; callers log and drop those events.
    pub async fn find_owner(&self, phone_number: &str) -> Result<Option<NumberOwner>> {
        let client = self.db.get().await?;

        let row = client
            .query_opt(
                "SELECT a.agent_id, a.customer_id, p.phone_id
                 FROM phone_numbers p
                 JOIN agents a ON a.agent_id = p.agent_id
                 WHERE p.phone_number = $1 AND p.status = $2
                 LIMIT 1",
                &[&phone_number, &PhoneStatus::Active.as_str()],
            )
            .await?;

        Ok(row.map(|r| NumberOwner {
            agent_id: r.get("agent_id"),
            customer_id: r.get("customer_id"),
            phone_id: r.get("phone_id"),
        }))
    }
}
