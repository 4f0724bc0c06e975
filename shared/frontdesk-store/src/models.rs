//! Row models and status enums shared by the repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent lifecycle status. Agents are never hard-deleted; removal is a
/// status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Deploying,
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploying => "deploying",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deploying" => Some(Self::Deploying),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Phone number status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneStatus {
    Active,
    Released,
}

impl PhoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Released => "released",
        }
    }
}

/// Subscription status, the internal vocabulary the payment provider's
/// statuses are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
    Unpaid,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Unpaid => "unpaid",
        }
    }

    /// An agent may only answer calls while the subscription is in one
    /// of these states.
    pub fn is_billable(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// One business's voice agent.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub agent_id: Uuid,
    pub customer_id: Uuid,
    pub external_agent_id: Option<String>,
    pub voice_id: String,
    pub voice_name: String,
    pub status: AgentStatus,
    pub webhook_url: Option<String>,
    pub error_message: Option<String>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Billing plan state for a customer.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub provider_subscription_id: String,
    pub provider_customer_id: String,
    pub plan_tier: String,
    pub minutes_included: i32,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// Owner of a provisioned phone number, resolved from an inbound webhook.
#[derive(Debug, Clone, Copy)]
pub struct NumberOwner {
    pub agent_id: Uuid,
    pub customer_id: Uuid,
    pub phone_id: Uuid,
}

/// Joined deployment status row for the polling API.
#[derive(Debug, Clone, Serialize)]
pub struct DeployStatus {
    pub status: String,
    pub agent_id: Option<Uuid>,
    pub external_agent_id: Option<String>,
    pub phone_number: Option<String>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub docs_processed: i64,
}
