//! Configuration for the deployment service

/// Deployment service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Public base URL of the platform, used to build webhook callbacks
    pub api_base_url: String,
    /// Speech provider API base URL
    pub speech_api_url: String,
    /// Telephony provider API base URL
    pub telephony_api_url: String,
    /// Country to provision numbers in (ISO 3166-1 alpha-2)
    pub number_country: String,
    /// Dialing prefix stored with provisioned numbers
    pub number_country_prefix: String,
    /// Language the agents speak
    pub agent_language: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8101".to_string())
                .parse()?,
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "https://api.frontdesk.example".to_string()),
            speech_api_url: std::env::var("SPEECH_API_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
            telephony_api_url: std::env::var("TELEPHONY_API_URL")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
            number_country: std::env::var("NUMBER_COUNTRY").unwrap_or_else(|_| "ES".to_string()),
            number_country_prefix: std::env::var("NUMBER_COUNTRY_PREFIX")
                .unwrap_or_else(|_| "+34".to_string()),
            agent_language: std::env::var("AGENT_LANGUAGE").unwrap_or_else(|_| "es".to_string()),
        })
    }

    /// Get socket address for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
