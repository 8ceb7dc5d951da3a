//! Courier Core - networking layer for a mobile client talking to a REST API
//!
//! This crate provides request shaping, deadlines, retries and token handling
//! for a single JSON backend.
//!
//! # Main Components
//!
//! - **Request Builder**: pagination, ordering and filter query encoding; multipart bodies
//! - **Retry Policy**: linear backoff with a ceiling and excluded status codes
//! - **API Client**: `read`, `create`, `partial_update`, `replace`, `remove`
//! - **Interceptors**: bearer-token attachment and response logging
//! - **Auth Session**: authenticated state derived from the cached token
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use courier_core::{init_logging, ApiClient, ClientConfig, LoggingConfig, MemoryTokenCache, Page, Result};
//!
//! async fn example() -> Result<()> {
//!     init_logging(LoggingConfig::development())?;
//!     let config = ClientConfig::from_env()?;
//!     let cache = Arc::new(MemoryTokenCache::new());
//!     let client = ApiClient::with_defaults(&config, cache)?;
//!
//!     let response = client.read("/items", Some(&Page::new(20, 1)), None, None).await?;
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;

// Re-export main types for convenience
pub use auth::{AuthSessionManager, Claims, JwtDecoder, MemoryTokenCache, Session, TokenCache, TokenDecoder};
pub use config::ClientConfig;
pub use error::{DecodeError, Error, Result};
pub use http::{
    ApiClient, ApiRequest, ApiResponse, BodyFormat, Filter, FilterValue, Interceptor, InterceptorPipeline,
    Page, QueryParams, RequestBody, RetryConfig, Sort, SortOrder, TimeoutConfig, Transport,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
