//! Configuration for the billing service

use rust_decimal::Decimal;
use std::str::FromStr;

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Payment provider API base URL
    pub payment_api_url: String,
    /// Price per overage minute, in EUR
    pub overage_price_per_minute: Decimal,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let overage_price = std::env::var("OVERAGE_PRICE_PER_MINUTE")
            .unwrap_or_else(|_| "0.15".to_string());

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8103".to_string())
                .parse()?,
            payment_api_url: std::env::var("PAYMENT_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            overage_price_per_minute: Decimal::from_str(&overage_price)
                .map_err(|e| anyhow::anyhow!("Invalid OVERAGE_PRICE_PER_MINUTE: {}", e))?,
        })
    }

    /// Get socket address for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
