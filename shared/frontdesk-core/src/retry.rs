//! Retry with exponential backoff and jitter.
//!
//! Used for any operation that can transiently fail: external provider
//! calls (speech, telephony, payment), database connections during cold
//! starts, and idempotent writes under contention.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Classifies an error as worth retrying or not.
///
/// Transient: network failures, provider 5xx, HTTP 429.
/// Permanent: any other 4xx or a business-rule rejection - retrying
/// cannot help, so the error is surfaced immediately without consuming
/// the retry budget.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Hard cap on the computed delay.
    pub max_delay: Duration,
    /// Add random jitter up to 50% of the computed delay.
    pub jitter: bool,
}

impl RetryPolicy {
    /// External provider APIs: 3 retries, 1s base, 10s cap, jitter on.
    pub fn external_api() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter: true,
        }
    }

    /// Database operations during cold start: 2 retries, 500ms base, no jitter.
    pub fn database() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3_000),
            jitter: false,
        }
    }

    /// Idempotent write operations: 1 retry, 2s base.
    pub fn idempotent_write() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(2_000),
            max_delay: Duration::from_millis(5_000),
            jitter: true,
        }
    }

    /// Backoff delay for the given zero-based attempt, before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if self.jitter {
            let jitter_ms = rand::thread_rng().gen_range(0.0..=0.5) * delay.as_millis() as f64;
            delay + Duration::from_millis(jitter_ms as u64)
        } else {
            delay
        }
    }
}

/// Execute an async operation with exponential backoff retries.
///
/// The operation runs at most `max_retries + 1` times. A permanent error
/// (per [`Transient`]) is returned after a single attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                let delay = policy.next_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FakeError {
        status: u16,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "http {}", self.status)
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            self.status == 429 || self.status >= 500
        }
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_server_error_uses_full_budget() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::external_api()
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), FakeError> = retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError { status: 500 }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), policy.max_retries + 1);
    }

    #[tokio::test]
    async fn client_error_consumes_exactly_one_attempt() {
        let policy = RetryPolicy::external_api();
        let attempts = AtomicU32::new(0);

        let result: Result<(), FakeError> = retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError { status: 404 }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::external_api()
        };
        let attempts = AtomicU32::new(0);

        let result: Result<u32, FakeError> = retry(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FakeError { status: 503 })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delays_are_monotonic_and_capped() {
        let policy = RetryPolicy::external_api();
        let mut previous = Duration::ZERO;
        for attempt in 0..8 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= previous);
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
        // 1s, 2s, 4s, then capped at 10s from attempt 4 onwards.
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
    }

    #[test]
    fn database_preset_has_no_jitter() {
        let policy = RetryPolicy::database();
        assert_eq!(policy.max_retries, 2);
        assert!(!policy.jitter);
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
    }
}
