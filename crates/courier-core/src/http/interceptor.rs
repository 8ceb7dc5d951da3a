//! Interceptor pipeline run around every transport call
//!
//! Request hooks run in insertion order before the transport sees the
//! request; outcome hooks run in reverse order on the way back, so the first
//! interceptor added is the outermost one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::TokenCache;
use crate::error::Result;
use crate::http::request::{ApiRequest, ApiResponse};
use crate::logging::redaction;

/// A pair of hooks around a transport call.
///
/// Outcome hooks may observe an error but must hand it back; the pipeline
/// never swallows a failure.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Adjust the outgoing request
    async fn on_request(&self, request: ApiRequest) -> ApiRequest {
        request
    }

    /// Observe the transport outcome
    fn on_outcome(&self, outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        outcome
    }
}

/// Explicit, ordered list of interceptors
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.push(Arc::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every request hook, first to last
    pub async fn apply_request(&self, mut request: ApiRequest) -> ApiRequest {
        for interceptor in &self.interceptors {
            request = interceptor.on_request(request).await;
        }
        request
    }

    /// Run every outcome hook, last to first
    pub fn apply_outcome(&self, mut outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        for interceptor in self.interceptors.iter().rev() {
            outcome = interceptor.on_outcome(outcome);
        }
        outcome
    }
}

impl fmt::Debug for InterceptorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorPipeline")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Attaches the cached token as a bearer credential.
///
/// Only requests to an allowed host get the header. A missing token leaves
/// the request unauthenticated; rejecting it is the server's call.
pub struct AuthTokenInterceptor {
    cache: Arc<dyn TokenCache>,
    allowed_domains: Vec<String>,
}

impl AuthTokenInterceptor {
    pub fn new(cache: Arc<dyn TokenCache>, allowed_domains: Vec<String>) -> Self {
        Self {
            cache,
            allowed_domains,
        }
    }

    fn is_allowed(&self, request: &ApiRequest) -> bool {
        match request.host() {
            Some(host) => self
                .allowed_domains
                .iter()
                .any(|domain| domain.eq_ignore_ascii_case(&host)),
            None => false,
        }
    }
}

#[async_trait]
impl Interceptor for AuthTokenInterceptor {
    async fn on_request(&self, mut request: ApiRequest) -> ApiRequest {
        if request.header("Authorization").is_some() {
            return request;
        }
        if !self.is_allowed(&request) {
            tracing::trace!(url = %request.url, "Host not in allowed domains, sending without token");
            return request;
        }

        match self.cache.get_token().await {
            Some(token) if !token.is_empty() => {
                request.set_header("Authorization", format!("Bearer {}", token));
            }
            _ => {
                tracing::debug!(url = %request.url, "No cached token, sending unauthenticated");
            }
        }
        request
    }
}

/// Logs every response and error without changing either
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    log_bodies: bool,
    preview_len: usize,
}

impl LoggingInterceptor {
    pub fn new(log_bodies: bool) -> Self {
        Self {
            log_bodies,
            preview_len: 512,
        }
    }

    /// Limit how much of a response body is logged
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }

    fn preview(&self, body: &str) -> String {
        let cut = body
            .char_indices()
            .nth(self.preview_len)
            .map(|(index, _)| index)
            .unwrap_or(body.len());
        redaction::redact_sensitive(&body[..cut])
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions))
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn on_outcome(&self, outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        match &outcome {
            Ok(response) if self.log_bodies => {
                tracing::debug!(
                    status = response.status,
                    body_len = response.body.len(),
                    body = %self.preview(&response.body),
                    "Response received"
                );
            }
            Ok(response) => {
                tracing::debug!(status = response.status, body_len = response.body.len(), "Response received");
            }
            Err(error) => {
                tracing::warn!(status = ?error.status(), error = %error, "Request failed");
            }
        }
        outcome
    }
}
