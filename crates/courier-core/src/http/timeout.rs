//! Timeout configuration and enforcement for API calls
//!
//! Every verb has its own per-attempt deadline; multipart uploads get a
//! longer one than plain JSON writes.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::retry::duration_ms;

/// Per-verb timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for each `read` attempt
    #[serde(with = "duration_ms")]
    pub read: Duration,
    /// Deadline for a JSON `create`
    #[serde(with = "duration_ms")]
    pub create: Duration,
    /// Deadline for a multipart `create`
    #[serde(with = "duration_ms")]
    pub upload: Duration,
    /// Deadline for `partial_update` and `replace`
    #[serde(with = "duration_ms")]
    pub update: Duration,
    /// Deadline for `remove`
    #[serde(with = "duration_ms")]
    pub remove: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(3000),
            create: Duration::from_millis(6000),
            upload: Duration::from_millis(15000),
            update: Duration::from_millis(3000),
            remove: Duration::from_millis(3000),
        }
    }
}

impl TimeoutConfig {
    /// Deadline for a `create` call
    pub fn for_create(&self, multipart: bool) -> Duration {
        if multipart {
            self.upload
        } else {
            self.create
        }
    }

    /// Validate timeout configuration
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("read", self.read),
            ("create", self.create),
            ("upload", self.upload),
            ("update", self.update),
            ("remove", self.remove),
        ];
        for (name, timeout) in all {
            if timeout.is_zero() {
                return Err(Error::configuration(format!("{} timeout cannot be zero", name)));
            }
        }
        Ok(())
    }
}

/// Run `future` under a deadline, mapping expiry to `Error::Timeout`
pub async fn with_timeout<F, T>(future: F, timeout: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { after: timeout }),
    }
}
