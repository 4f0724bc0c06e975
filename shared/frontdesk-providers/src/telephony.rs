//! Telephony provider client.
//!
//! Searches the provider's inventory for voice-capable numbers and
//! purchases them with the voice and status-callback URLs already
//! attached, so a number is never live without routing.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::ProviderError;

/// Purchase parameters. `voice_url` receives inbound calls, the
/// status callback every call lifecycle event.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub phone_number: String,
    pub friendly_name: String,
    pub voice_url: String,
    pub status_callback_url: String,
}

#[derive(Debug, Clone)]
pub struct PurchasedNumber {
    pub phone_number: String,
    /// Provider-side identifier of the purchased number.
    pub number_sid: String,
}

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Voice-capable numbers currently available in the given country.
    async fn search_numbers(
        &self,
        country: &str,
        limit: u32,
    ) -> Result<Vec<String>, ProviderError>;

    async fn purchase_number(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchasedNumber, ProviderError>;
}

pub struct HttpTelephonyClient {
    base_url: String,
    account_sid: String,
    auth_token: String,
    http_client: reqwest::Client,
}

impl HttpTelephonyClient {
    pub fn new(base_url: String, account_sid: String, auth_token: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            account_sid,
            auth_token,
            http_client,
        }
    }
}

#[async_trait]
impl TelephonyProvider for HttpTelephonyClient {
    async fn search_numbers(
        &self,
        country: &str,
        limit: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/AvailablePhoneNumbers/{}/Local.json?VoiceEnabled=true&PageSize={}",
            self.base_url, self.account_sid, country, limit
        );

        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let numbers = result["available_phone_numbers"]
            .as_array()
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing available_phone_numbers".to_string())
            })?
            .iter()
            .filter_map(|n| n["phone_number"].as_str())
            .map(str::to_string)
            .collect();

        Ok(numbers)
    }

    async fn purchase_number(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchasedNumber, ProviderError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/IncomingPhoneNumbers.json",
            self.base_url, self.account_sid
        );

        let form = [
            ("PhoneNumber", request.phone_number.as_str()),
            ("FriendlyName", request.friendly_name.as_str()),
            ("VoiceUrl", request.voice_url.as_str()),
            ("VoiceMethod", "POST"),
            ("StatusCallback", request.status_callback_url.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];

        let response = self
            .http_client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let phone_number = result["phone_number"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("missing phone_number".to_string()))?
            .to_string();
        let number_sid = result["sid"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("missing sid".to_string()))?
            .to_string();

        Ok(PurchasedNumber {
            phone_number,
            number_sid,
        })
    }
}
