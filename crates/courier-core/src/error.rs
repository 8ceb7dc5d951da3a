//! Error types for the Courier core library
//!
//! This module defines the error taxonomy shared by the request layer and the
//! auth session manager, using thiserror for ergonomic error definitions.
//! Retry decisions only look at [`Error::status`], so every variant that can
//! come back from a transport keeps its original status code intact.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Courier operations
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a non-success status, or no response was
    /// received at all (status `0`)
    #[error("Transport error: HTTP {status}: {body}")]
    Transport {
        status: u16,
        body: String,
    },

    /// The attempt did not complete within its deadline
    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout {
        after: Duration,
    },

    /// A token could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The retry budget ran out; only produced when the retry configuration
    /// asks for wrapped errors
    #[error("Giving up after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last_error: Box<Error>,
    },

    /// The caller cancelled the call before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// The request body could not be encoded
    #[error("Invalid request body: {message}")]
    InvalidBody {
        message: String,
    },

    /// The transport could not turn an `ApiRequest` into a wire request
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Status code carried by this error, if any.
    ///
    /// `ExhaustedRetries` reports the status of the error it wraps so callers
    /// can match on the original status either way.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            Error::ExhaustedRetries { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Whether this error is (or wraps) an attempt timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::ExhaustedRetries { last_error, .. } => last_error.is_timeout(),
            _ => false,
        }
    }
}

/// Failure to decode an auth token.
///
/// Never reaches UI callers: the session manager treats it as "not
/// authenticated" and drops the token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Token payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Token payload is not a JSON object: {0}")]
    Payload(String),
}
