//! HTTP layer
//!
//! - `builder`: query and multipart encoding, URL assembly
//! - `request`: request/response values passed through the pipeline
//! - `interceptor`: request and outcome hooks
//! - `retry`: linear backoff policy for reads
//! - `timeout`: per-verb deadlines
//! - `transport`: the wire seam and its reqwest implementation
//! - `client`: the verbs tying it all together

pub mod builder;
pub mod client;
pub mod interceptor;
pub mod request;
pub mod retry;
pub mod timeout;
pub mod transport;

pub use builder::{
    encode_multipart, encode_multipart_json, encode_query, Filter, FilterValue, MultipartBody, Page,
    QueryParams, RequestBuilder, Sort, SortOrder,
};
pub use client::{ApiClient, BodyFormat};
pub use interceptor::{AuthTokenInterceptor, Interceptor, InterceptorPipeline, LoggingInterceptor};
pub use request::{ApiRequest, ApiResponse, RequestBody};
pub use retry::{execute_with_retry, RetryAttempt, RetryConfig, RetryDecision};
pub use timeout::{with_timeout, TimeoutConfig};
pub use transport::{ReqwestTransport, Transport};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
