//! Logging setup and redaction helpers
//!
//! The library itself only emits `tracing` events. Host applications that do
//! not install their own subscriber can call [`init_logging`]. Anything that
//! might carry a credential goes through [`redaction`] before it is logged.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "COURIER_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, used when `RUST_LOG` is not set
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include file and line numbers
    pub source_location: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Debug-level config for development builds
    pub fn development() -> Self {
        Self {
            level: "courier_core=debug,info".to_string(),
            format: LogFormat::Full,
            source_location: true,
        }
    }

    /// Apply `RUST_LOG` and `COURIER_LOG_FORMAT` overrides
    pub fn merge_with_env(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    fn merge_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("RUST_LOG") {
            self.level = level;
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            match format.to_lowercase().as_str() {
                "compact" => self.format = LogFormat::Compact,
                "full" => self.format = LogFormat::Full,
                "json" => self.format = LogFormat::Json,
                _ => tracing::warn!("Invalid log format: {}, using default", format),
            }
        }
    }
}

/// Install a global `tracing` subscriber.
///
/// Environment overrides are applied first. Fails if a global subscriber is
/// already installed.
pub fn init_logging(mut config: LoggingConfig) -> Result<()> {
    config.merge_with_env();

    let env_filter = EnvFilter::try_new(&config.level).map_err(|e| Error::Configuration {
        message: format!("Invalid log filter: {}", config.level),
        source: Some(Box::new(e)),
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
        LogFormat::Full => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())
        }
    };
    installed.map_err(|e| Error::Configuration {
        message: "Failed to initialize logging".to_string(),
        source: Some(Box::new(e)),
    })?;

    tracing::debug!(config = ?config, "Logging system initialized");
    Ok(())
}

/// Sensitive data redaction utilities
pub mod redaction {
    use regex::Regex;
    use std::sync::OnceLock;

    static BEARER_REGEX: OnceLock<Regex> = OnceLock::new();
    static JWT_REGEX: OnceLock<Regex> = OnceLock::new();
    static FIELD_REGEX: OnceLock<Regex> = OnceLock::new();

    fn bearer() -> &'static Regex {
        BEARER_REGEX.get_or_init(|| {
            Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9._~+/=-]+").expect("valid bearer pattern")
        })
    }

    fn jwt() -> &'static Regex {
        JWT_REGEX.get_or_init(|| {
            Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").expect("valid jwt pattern")
        })
    }

    fn field() -> &'static Regex {
        FIELD_REGEX.get_or_init(|| {
            Regex::new(r#"(?i)("?(?:access_token|refresh_token|token|password)"?\s*[:=]\s*)"[^"]*""#)
                .expect("valid field pattern")
        })
    }

    /// Redact bearer credentials, JWTs and token/password fields
    pub fn redact_sensitive(input: &str) -> String {
        let result = field().replace_all(input, r#"$1"***""#);
        let result = bearer().replace_all(&result, "$1 ***");
        jwt().replace_all(&result, "***").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_redacts_bearer_header() {
        let redacted = redaction::redact_sensitive("Authorization: Bearer abc.def-123");
        assert_eq!(redacted, "Authorization: Bearer ***");
    }

    #[test]
    fn test_redacts_json_token_fields() {
        let redacted =
            redaction::redact_sensitive(r#"{"user":"ana","token":"s3cr3t","password": "hunter2"}"#);
        assert_eq!(redacted, r#"{"user":"ana","token":"***","password": "***"}"#);
    }

    #[test]
    fn test_redacts_bare_jwt() {
        let token = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln";
        let redacted = redaction::redact_sensitive(&format!("got {} back", token));
        assert_eq!(redacted, "got *** back");
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        let input = r#"{"items":[{"id":1,"name":"lamp"}]}"#;
        assert_eq!(redaction::redact_sensitive(input), input);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);

        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("RUST_LOG", "courier_core=trace"), (LOG_FORMAT_ENV, "JSON")].into();
        let mut config = LoggingConfig::default();
        config.merge_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.level, "courier_core=trace");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_format_override_is_ignored() {
        let mut config = LoggingConfig::development();
        config.merge_from(|key| (key == LOG_FORMAT_ENV).then(|| "xml".to_string()));

        assert_eq!(config.format, LogFormat::Full);
        assert_eq!(config.level, "courier_core=debug,info");
    }

    #[test]
    fn test_init_logging_installs_once() {
        assert!(init_logging(LoggingConfig::development()).is_ok());

        let err = init_logging(LoggingConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
