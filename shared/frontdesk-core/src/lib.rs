//! Frontdesk Core
//!
//! Shared infrastructure for all Frontdesk microservices:
//! - Retry policies with exponential backoff for unreliable provider calls
//! - Process-lifetime secret resolution
//! - Common error type for cross-crate plumbing

mod error;
mod retry;
mod secrets;

pub use error::{FrontdeskError, Result};
pub use retry::{retry, RetryPolicy, Transient};
pub use secrets::Secrets;
