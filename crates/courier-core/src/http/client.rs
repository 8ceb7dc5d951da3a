//! Verb-oriented API client
//!
//! Every verb follows the same template: shape the query or body, run the
//! request hooks, call the transport under the verb's deadline, run the
//! outcome hooks, and on failure either retry (reads only) or hand the error
//! back unchanged. Successful responses are returned as-is; no envelope is
//! unwrapped.
//!
//! Writes are never retried. Without idempotency keys a repeated POST, PUT,
//! PATCH or DELETE can apply twice.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::auth::TokenCache;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::builder::{encode_multipart_json, encode_query, Filter, Page, QueryParams, RequestBuilder, Sort};
use crate::http::interceptor::{AuthTokenInterceptor, InterceptorPipeline, LoggingInterceptor};
use crate::http::request::{ApiRequest, ApiResponse, RequestBody};
use crate::http::retry::{execute_with_retry, RetryConfig};
use crate::http::timeout::{with_timeout, TimeoutConfig};
use crate::http::transport::{ReqwestTransport, Transport};

/// How a write body is put on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    /// `application/json`
    #[default]
    Json,
    /// `multipart/form-data`, one text field per top-level key
    Multipart,
}

/// API client composing request shaping, interceptors, deadlines and retries
#[derive(Clone)]
pub struct ApiClient {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    pipeline: InterceptorPipeline,
    timeouts: TimeoutConfig,
    read_retry: RetryConfig,
    cancel: Option<CancellationToken>,
}

impl ApiClient {
    /// Create a client over an explicit transport and pipeline
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        pipeline: InterceptorPipeline,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: RequestBuilder::new(&config.api_url),
            transport,
            pipeline,
            timeouts: config.timeouts.clone(),
            read_retry: config.read_retry.clone(),
            cancel: None,
        })
    }

    /// Create a client with the reqwest transport, bearer-token attachment and
    /// response logging
    pub fn with_defaults(config: &ClientConfig, cache: Arc<dyn TokenCache>) -> Result<Self> {
        let pipeline = InterceptorPipeline::new()
            .with(AuthTokenInterceptor::new(cache, config.allowed_hosts()))
            .with(LoggingInterceptor::new(config.debug_responses));
        Self::new(config, Arc::new(ReqwestTransport::new()?), pipeline)
    }

    /// A handle whose calls end with `Error::Cancelled` once `token` fires.
    ///
    /// Pending transport calls and retry timers are dropped at that point.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self.clone()
        }
    }

    /// GET `path` with pagination, ordering and filters, retrying failures
    /// with the configured read policy
    pub async fn read(
        &self,
        path: &str,
        pagination: Option<&Page>,
        sort: Option<&Sort>,
        filter: Option<&Filter>,
    ) -> Result<ApiResponse> {
        self.read_with(path, pagination, sort, filter, &self.read_retry).await
    }

    /// [`read`](Self::read) with a call-site retry policy
    pub async fn read_with(
        &self,
        path: &str,
        pagination: Option<&Page>,
        sort: Option<&Sort>,
        filter: Option<&Filter>,
        retry: &RetryConfig,
    ) -> Result<ApiResponse> {
        let query = encode_query(pagination, sort, filter);
        let request = self.builder.build(Method::GET, path, query, RequestBody::Empty);
        self.execute(request, self.timeouts.read, Some(retry)).await
    }

    /// POST `body` to `path`
    pub async fn create<B>(&self, path: &str, body: &B, format: BodyFormat) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body, format)?;
        let timeout = self.timeouts.for_create(format == BodyFormat::Multipart);
        let request = self.builder.build(Method::POST, path, QueryParams::new(), body);
        self.execute(request, timeout, None).await
    }

    /// PATCH `body` to `path`
    pub async fn partial_update<B>(&self, path: &str, body: &B, format: BodyFormat) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body, format)?;
        let request = self.builder.build(Method::PATCH, path, QueryParams::new(), body);
        self.execute(request, self.timeouts.update, None).await
    }

    /// PUT `body` to `path`
    pub async fn replace<B>(&self, path: &str, body: &B, format: BodyFormat) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body, format)?;
        let request = self.builder.build(Method::PUT, path, QueryParams::new(), body);
        self.execute(request, self.timeouts.update, None).await
    }

    /// DELETE `path`
    pub async fn remove(&self, path: &str) -> Result<ApiResponse> {
        let request = self.builder.build(Method::DELETE, path, QueryParams::new(), RequestBody::Empty);
        self.execute(request, self.timeouts.remove, None).await
    }

    async fn execute(
        &self,
        request: ApiRequest,
        timeout: Duration,
        retry: Option<&RetryConfig>,
    ) -> Result<ApiResponse> {
        let span = tracing::debug_span!("api_call", method = %request.method, url = %request.url);

        let call = async move {
            match retry {
                Some(config) => {
                    execute_with_retry(|| self.attempt(request.clone(), timeout), config).await
                }
                None => self.attempt(request, timeout).await,
            }
        };

        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!("Call cancelled by caller");
                        Err(Error::Cancelled)
                    }
                    result = call.instrument(span) => result,
                }
            }
            None => call.instrument(span).await,
        }
    }

    /// One transport round-trip through the interceptor pipeline
    async fn attempt(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse> {
        let outcome = with_timeout(
            async {
                let request = self.pipeline.apply_request(request).await;
                self.transport.send(request).await
            },
            timeout,
        )
        .await;
        self.pipeline.apply_outcome(outcome)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("builder", &self.builder)
            .field("pipeline", &self.pipeline)
            .field("timeouts", &self.timeouts)
            .field("read_retry", &self.read_retry)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

fn encode_body<B>(body: &B, format: BodyFormat) -> Result<RequestBody>
where
    B: Serialize + ?Sized,
{
    let value = serde_json::to_value(body).map_err(|e| Error::InvalidBody {
        message: e.to_string(),
    })?;

    match format {
        BodyFormat::Json => Ok(RequestBody::Json(value)),
        BodyFormat::Multipart => match value {
            Value::Object(map) => Ok(RequestBody::Multipart(encode_multipart_json(&map))),
            other => Err(Error::InvalidBody {
                message: format!("multipart body must be an object, got {}", other),
            }),
        },
    }
}
