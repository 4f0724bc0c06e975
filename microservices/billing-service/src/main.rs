//! Billing Service
//!
//! Usage and billing reconciliation:
//! - Ingest of completed-call usage from the webhook service
//! - Exact-decimal overage computation against the plan's included minutes
//! - Metered-billing reporting to the payment provider
//! - Current-period usage summaries for dashboards

mod config;
mod error;
mod handlers;
mod reconciler;
mod routes;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frontdesk_core::Secrets;
use frontdesk_providers::{HttpPaymentClient, PaymentProvider};
use frontdesk_store::StorePool;

pub use config::Config;
pub use error::{Error, Result};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: StorePool,
    pub payment: Arc<dyn PaymentProvider>,
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

    info!("Starting billing service");

    let config = Config::from_env()?;
    let secrets = Secrets::from_env()?;
    let bind_addr = config.bind_address();

    let db = StorePool::from_env().await?;

    let payment: Arc<dyn PaymentProvider> = Arc::new(HttpPaymentClient::new(
        config.payment_api_url.clone(),
        secrets.payment_api_key.clone(),
    ));

    let state = AppState {
        db,
        payment,
        config: Arc::new(config),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Billing service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
