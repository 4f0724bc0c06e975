//! Error types for the webhook service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Webhook service error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signature present but wrong. No state was mutated.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] frontdesk_store::StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] frontdesk_providers::ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Signature failures are uniformly 403, present-but-wrong
            // and absent alike. No state was mutated.
            Error::InvalidSignature | Error::MissingSignature => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            // 500 makes the provider redeliver; handlers are idempotent.
            Error::Store(_) | Error::Provider(_) | Error::Internal(_) => {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_forbidden() {
        let response = Error::InvalidSignature.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = Error::MissingSignature.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn malformed_payloads_are_bad_requests() {
        let response = Error::InvalidRequest("missing CallSid".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_redeliver_with_500() {
        let err = Error::Store(frontdesk_store::StoreError::Pool("exhausted".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
