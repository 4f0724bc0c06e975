//! Webhook Service
//!
//! Single entry point for provider callbacks:
//! - Telephony call lifecycle (production and onboarding test calls)
//! - Outbound voice bridge (call registration with the speech agent)
//! - Payment subscription lifecycle
//!
//! Every route validates the provider's signature over the raw request
//! body before touching any state.

mod config;
mod error;
mod events;
mod handlers;
mod payment;
mod routes;
mod telephony;
mod usage;
mod voice;

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frontdesk_core::Secrets;
use frontdesk_providers::{HttpSpeechClient, SpeechProvider};
use frontdesk_store::StorePool;

pub use config::Config;
pub use error::{Error, Result};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: StorePool,
    pub speech: Arc<dyn SpeechProvider>,
    pub secrets: Arc<Secrets>,
    /// Client for the billing ingest endpoint.
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting webhook service");

    let config = Config::from_env()?;
    let secrets = Secrets::from_env()?;
    let bind_addr = config.bind_address();

    let db = StorePool::from_env().await?;

    let speech: Arc<dyn SpeechProvider> = Arc::new(HttpSpeechClient::new(
        config.speech_api_url.clone(),
        secrets.speech_api_key.clone(),
    ));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState {
        db,
        speech,
        secrets: Arc::new(secrets),
        http,
        config: Arc::new(config),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Webhook service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
