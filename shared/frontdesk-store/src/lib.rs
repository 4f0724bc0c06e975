//! Frontdesk Store
//!
//! PostgreSQL system of record for agents, phone numbers, customers,
//! subscriptions, test calls and usage records, plus the append-only
//! call-event log. Provides connection pooling and typed repositories.

mod error;
mod models;
mod pool;

pub mod agents;
pub mod call_events;
pub mod phones;
pub mod subscriptions;
pub mod test_calls;
pub mod usage;

pub use error::{Result, StoreError};
pub use models::*;
pub use pool::{PoolConfig, StorePool};

/// Re-export tokio-postgres types for convenience
pub use tokio_postgres::Row;
