//! Frontdesk provider clients
//!
//! Thin typed clients for the three external providers the platform
//! depends on: the speech-agent provider, the telephony provider and the
//! payment provider. Each wraps plain HTTP calls with fixed timeouts and
//! a shared error type that classifies transient vs permanent failures
//! for the retry layer.
//!
//! Also hosts the provider-specific webhook signature schemes; both
//! operate on the raw, unparsed request bytes.

mod error;
pub mod payment;
pub mod signature;
pub mod speech;
pub mod telephony;

pub use error::ProviderError;
pub use payment::{HttpPaymentClient, PaymentProvider};
pub use speech::{CallRouting, HttpSpeechClient, SpeechProvider};
pub use telephony::{HttpTelephonyClient, TelephonyProvider};
