//! Configuration for the webhook service

/// Webhook service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Public base URL of the platform. Telephony signatures are
    /// computed over the full public callback URL, so this must match
    /// what the provider was configured with.
    pub api_base_url: String,
    /// Billing service base URL for usage ingest
    pub billing_base_url: String,
    /// Speech provider API base URL
    pub speech_api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8102".to_string())
                .parse()?,
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "https://api.frontdesk.example".to_string()),
            billing_base_url: std::env::var("BILLING_BASE_URL")
                .unwrap_or_else(|_| "http://billing-service:8103".to_string()),
            speech_api_url: std::env::var("SPEECH_API_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
        })
    }

    /// Get socket address for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
