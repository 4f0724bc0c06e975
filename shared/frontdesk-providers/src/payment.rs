//! Payment provider client.
//!
//! Only the metered-billing surface: finding the metered subscription
//! item for a subscription and reporting overage quantities against it.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::ProviderError;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Subscription item with metered usage pricing, if the
    /// subscription carries one.
    async fn metered_item(&self, subscription_id: &str) -> Result<Option<String>, ProviderError>;

    /// Report a usage quantity against a metered item. Returns the
    /// provider's record id for the submission.
    async fn report_usage(&self, item_id: &str, quantity: u64) -> Result<String, ProviderError>;
}

pub struct HttpPaymentClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl HttpPaymentClient {
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
}

#[async_trait]
impl PaymentProvider for HttpPaymentClient {
    async fn metered_item(&self, subscription_id: &str) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/v1/subscriptions/{}?expand[]=items.data.price",
            self.base_url, subscription_id
        );

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
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

        let items = result["items"]["data"]
            .as_array()
            .ok_or_else(|| ProviderError::InvalidResponse("missing items.data".to_string()))?;

        let metered = items
            .iter()
            .find(|item| item["price"]["recurring"]["usage_type"].as_str() == Some("metered"))
            .and_then(|item| item["id"].as_str())
            .map(str::to_string);

        Ok(metered)
    }

    async fn report_usage(&self, item_id: &str, quantity: u64) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1/subscription_items/{}/usage_records",
            self.base_url, item_id
        );

        let quantity_str = quantity.to_string();
        let form = [("quantity", quantity_str.as_str()), ("action", "set")];

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
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

        result["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("missing usage record id".to_string()))
    }
}
