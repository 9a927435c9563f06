use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::constants::{
    MAX_DELIVERY_ATTEMPTS, RETRY_BACKOFF_MULTIPLIER, RETRY_INITIAL_DELAY_SECS,
    RETRY_MAX_DELAY_SECS,
};
use crate::transport::error::TransportError;

/// Bounded exponential backoff applied around network calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    #[serde(with = "duration_secs")]
    pub initial_delay: Duration,
    pub multiplier: u32,
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_DELIVERY_ATTEMPTS,
            initial_delay: Duration::from_secs(RETRY_INITIAL_DELAY_SECS),
            multiplier: RETRY_BACKOFF_MULTIPLIER,
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Value produced by a retried operation along with the retries it took.
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub retries: u32,
}

/// Final error of a retried operation along with the retries performed
/// before it.
#[derive(Debug)]
pub struct RetryFailure {
    pub error: TransportError,
    pub retries: u32,
}

impl From<TransportError> for RetryFailure {
    fn from(error: TransportError) -> Self {
        Self { error, retries: 0 }
    }
}

impl From<RetryFailure> for TransportError {
    fn from(failure: RetryFailure) -> Self {
        failure.error
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// `max_attempts` is reached.
///
/// Only timeouts and connection failures are retried. An HTTP error status
/// is returned on the spot. When attempts run out the last transient error
/// is returned unchanged.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<Retried<T>, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(Retried {
                    value,
                    retries: (attempt - 1) as u32,
                });
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for_retry(attempt as u32);
                warn!(
                    "{} attempt {}/{} failed, retrying in {:?}: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay,
                    e.safe_message()
                );
                sleep(delay).await;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("{} failed after {} attempts: {}", label, attempt, e.safe_message());
                }
                return Err(RetryFailure {
                    error: e,
                    retries: (attempt - 1) as u32,
                });
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
