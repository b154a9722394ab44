//! Shared retry wrapper for ledger reads.
//!
//! Every read in the client layer goes through [`retry_read`]: transient
//! failures are absorbed and retried with exponential backoff, and an
//! exhausted read surfaces as `None` rather than an error. Writes never
//! come through here; they are single-shot by design.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::GatewayError;

/// Attempt count and backoff base for retried reads.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed attempt: `base * 2^attempt`, so 2s after the
    /// first failure, 4s after the second.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run a read operation with retries, absorbing transient failures.
///
/// Returns the first successful value, or `None` once all attempts are
/// exhausted. The last error is logged, never propagated.
pub async fn retry_read<T, F, Fut>(policy: &RetryPolicy, op: &str, mut call: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    for attempt in 1..=policy.attempts {
        match call().await {
            Ok(value) => {
                debug!(op = %op, attempt = attempt, "ledger read succeeded");
                return Some(value);
            }
            Err(e) if attempt < policy.attempts => {
                warn!(op = %op, attempt = attempt, error = %e, "ledger read failed, retrying");
                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
            Err(e) => {
                error!(op = %op, attempts = policy.attempts, error = %e, "ledger read exhausted retries");
            }
        }
    }
    None
}
