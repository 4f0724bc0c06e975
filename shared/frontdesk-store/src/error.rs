//! Store error types

use frontdesk_core::Transient;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Connection and pool failures may clear once the database is up; a
/// bad configuration never does.
impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Pool(_) => true,
            Self::Configuration(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_permanent() {
        assert!(StoreError::Pool("timed out waiting for connection".into()).is_transient());
        assert!(!StoreError::Configuration("invalid url".into()).is_transient());
    }
}
