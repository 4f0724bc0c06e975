//! Provider credential resolution.
//!
//! Secrets are resolved once at service start-up and cached for the
//! process lifetime. Services carry them in their shared state rather
//! than re-reading the environment per request.

use crate::error::{FrontdeskError, Result};

/// API keys and webhook secrets for the external providers.
#[derive(Clone)]
pub struct Secrets {
    /// Speech-agent provider API key.
    pub speech_api_key: String,
    /// Telephony provider account identifier.
    pub telephony_account_sid: String,
    /// Telephony provider auth token. Also the HMAC key for webhook
    /// signature validation.
    pub telephony_auth_token: String,
    /// Payment provider secret key.
    pub payment_api_key: String,
    /// Payment provider webhook signing secret.
    pub payment_webhook_secret: String,
}

impl Secrets {
    /// Resolve all provider secrets from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            speech_api_key: required("SPEECH_API_KEY")?,
            telephony_account_sid: required("TELEPHONY_ACCOUNT_SID")?,
            telephony_auth_token: required("TELEPHONY_AUTH_TOKEN")?,
            payment_api_key: required("PAYMENT_API_KEY")?,
            payment_webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    // Secrets are never logged
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| FrontdeskError::Config(format!("missing required secret: {}", name)))
}
