//! Error types for the deployment service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Deployment service error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent is not awaiting deployment: {0}")]
    NotDeploying(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider inventory is empty for the configured country. A
    /// business failure, never retried.
    #[error("No voice-capable numbers available in {0}")]
    NoNumbersAvailable(String),

    /// The purchased number is not visible as an active link to the
    /// agent. The link stage fails closed on this.
    #[error("Phone number {0} is not linked to agent {1}")]
    PhoneNotLinked(uuid::Uuid, uuid::Uuid),

    #[error("Provider error: {0}")]
    Provider(#[from] frontdesk_providers::ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] frontdesk_store::StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::AgentNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::NotDeploying(_) => (StatusCode::CONFLICT, self.to_string()),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NoNumbersAvailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            Error::PhoneNotLinked(_, _)
            | Error::Provider(_)
            | Error::Store(_)
            | Error::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
