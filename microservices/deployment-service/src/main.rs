//! Deployment Service
//!
//! Provisioning workflow engine for voice agents:
//! - Four-stage deployment: create agent, provision number, link, finalize
//! - Trigger API (`POST /deploy`) with fire-and-forget execution
//! - Status polling API for onboarding frontends
//! - Exponential-backoff retries around every provider call

mod config;
mod error;
mod handlers;
mod prompt;
mod routes;
mod workflow;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frontdesk_core::Secrets;
use frontdesk_providers::{
    HttpSpeechClient, HttpTelephonyClient, SpeechProvider, TelephonyProvider,
};
use frontdesk_store::StorePool;

pub use config::Config;
pub use error::{Error, Result};

/// Application state shared across handlers and workflow executions
#[derive(Clone)]
pub struct AppState {
    pub db: StorePool,
    pub speech: Arc<dyn SpeechProvider>,
    pub telephony: Arc<dyn TelephonyProvider>,
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

    info!("Starting deployment service");

    let config = Config::from_env()?;
    let secrets = Secrets::from_env()?;
    let bind_addr = config.bind_address();

    let db = StorePool::from_env().await?;

    let speech: Arc<dyn SpeechProvider> = Arc::new(HttpSpeechClient::new(
        config.speech_api_url.clone(),
        secrets.speech_api_key.clone(),
    ));
    let telephony: Arc<dyn TelephonyProvider> = Arc::new(HttpTelephonyClient::new(
        config.telephony_api_url.clone(),
        secrets.telephony_account_sid.clone(),
        secrets.telephony_auth_token.clone(),
    ));

    let state = AppState {
        db,
        speech,
        telephony,
        config: Arc::new(config),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Deployment service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
