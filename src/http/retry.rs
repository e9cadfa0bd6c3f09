//! Retry logic for network operations with failure classification.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use super::transport::TransportFailure;

/// Whether a failure is worth retrying unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    NonTransient,
}

/// Classifies a failed attempt.
///
/// No response, timeouts and 5xx statuses are transient. 4xx statuses and
/// anything else fail immediately.
pub fn classify(failure: &TransportFailure) -> FailureClass {
    match failure {
        TransportFailure::NoResponse { .. } | TransportFailure::Timeout { .. } => {
            FailureClass::Transient
        }
        TransportFailure::HttpStatus { status, .. } if (500..=599).contains(status) => {
            FailureClass::Transient
        }
        TransportFailure::HttpStatus { .. } | TransportFailure::Other { .. } => {
            FailureClass::NonTransient
        }
    }
}

/// Delay before retry number `attempt_index` (0 for the first retry).
pub fn backoff_delay(base: Duration, attempt_index: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt_index))
}

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Runs `operation` until it succeeds, fails non-transiently, or the retry
/// budget is spent. Attempts are strictly sequential. The last observed
/// failure is returned.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, TransportFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportFailure>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(failure) => {
                if classify(&failure) == FailureClass::NonTransient {
                    debug!("{}: non-transient failure: {}", operation_name, failure);
                    return Err(failure);
                }
                if attempt >= policy.retries {
                    warn!(
                        "{}: giving up after {} attempts ({})",
                        operation_name,
                        policy.max_attempts(),
                        failure
                    );
                    return Err(failure);
                }

                let delay = backoff_delay(policy.base_delay, attempt);
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    policy.max_attempts(),
                    failure,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
