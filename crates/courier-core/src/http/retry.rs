//! Retry logic with linear backoff for HTTP requests
//!
//! The policy is a pure decision over one failure at a time: the Nth failure
//! either schedules a retry after `N * scaling_duration` or ends the call.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first failure
    pub max_retry_attempts: u32,
    /// Backoff unit; the Nth retry waits `N * scaling_duration`
    #[serde(with = "duration_ms")]
    pub scaling_duration: Duration,
    /// Status codes that end the call on the first occurrence
    pub excluded_status_codes: HashSet<u16>,
    /// Wrap the final error in `Error::ExhaustedRetries` when the attempt
    /// budget runs out
    pub wrap_exhausted: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            scaling_duration: Duration::from_millis(1000),
            excluded_status_codes: HashSet::new(),
            wrap_exhausted: false,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with a custom attempt budget
    pub fn new(max_retry_attempts: u32) -> Self {
        Self {
            max_retry_attempts,
            ..Default::default()
        }
    }

    /// Set the backoff unit
    pub fn with_scaling_duration(mut self, scaling_duration: Duration) -> Self {
        self.scaling_duration = scaling_duration;
        self
    }

    /// Never retry responses with these status codes
    pub fn with_excluded_status_codes<I: IntoIterator<Item = u16>>(mut self, codes: I) -> Self {
        self.excluded_status_codes.extend(codes);
        self
    }

    /// Wrap the last error once the attempt budget runs out
    pub fn with_wrap_exhausted(mut self, wrap: bool) -> Self {
        self.wrap_exhausted = wrap;
        self
    }

    /// Decide what to do about the `attempt_number`th failure (1-indexed)
    pub fn decide(&self, attempt_number: u32, error: &Error) -> RetryDecision {
        if attempt_number > self.max_retry_attempts || self.is_excluded(error) {
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry {
            after: self.scaling_duration.saturating_mul(attempt_number),
        }
    }

    fn is_excluded(&self, error: &Error) -> bool {
        error
            .status()
            .map(|status| self.excluded_status_codes.contains(&status))
            .unwrap_or(false)
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { after: Duration },
    /// Stop and propagate the failure
    GiveUp,
}

/// One failed attempt, as seen by the retry executor
#[derive(Debug)]
pub struct RetryAttempt<'a> {
    pub attempt_number: u32,
    pub error: &'a Error,
    /// Total backoff slept before this attempt was issued
    pub elapsed_backoff: Duration,
}

/// Execute an operation with retry logic.
///
/// Attempts are strictly sequential: the next one is only issued after the
/// previous failure has been observed and its backoff has elapsed.
pub async fn execute_with_retry<F, Fut, T>(mut operation: F, config: &RetryConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut elapsed_backoff = Duration::ZERO;
    let mut attempt_number = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        attempt_number += 1;

        let attempt = RetryAttempt {
            attempt_number,
            error: &error,
            elapsed_backoff,
        };

        match config.decide(attempt_number, &error) {
            RetryDecision::Retry { after } => {
                log::warn!(
                    "Request failed (attempt {}, {:?} backoff so far), retrying after {:?}: {}",
                    attempt.attempt_number,
                    attempt.elapsed_backoff,
                    after,
                    attempt.error
                );
                tokio::time::sleep(after).await;
                elapsed_backoff += after;
            }
            RetryDecision::GiveUp => {
                log::error!(
                    "Request failed after {} attempts, not retrying: {}",
                    attempt.attempt_number,
                    attempt.error
                );
                let exhausted = attempt_number > config.max_retry_attempts;
                if config.wrap_exhausted && exhausted {
                    return Err(Error::ExhaustedRetries {
                        attempts: attempt_number,
                        last_error: Box::new(error),
                    });
                }
                return Err(error);
            }
        }
    }
}

/// Serde helper storing durations as integer milliseconds
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
