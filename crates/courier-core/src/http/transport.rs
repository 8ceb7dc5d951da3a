//! HTTP transport seam
//!
//! The client never talks to the network directly; it hands each prepared
//! `ApiRequest` to a `Transport`. `ReqwestTransport` is the production
//! implementation, tests script their own.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, StatusCode};

use crate::error::{Error, Result};
use crate::http::request::{ApiRequest, ApiResponse, RequestBody};

/// Sends one request and reports the response or a status-carrying error
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`. Non-2xx responses come back as `Error::Transport`.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `Transport` backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Create a transport with a default reqwest client.
    ///
    /// Deadlines are enforced per verb by the API client, so the reqwest
    /// client itself carries none.
    pub fn new() -> Result<Self> {
        let client = ReqwestClient::builder().build().map_err(|e| Error::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    fn build_request(&self, request: ApiRequest) -> Result<reqwest::Request> {
        let is_multipart = matches!(request.body, RequestBody::Multipart(_));
        let mut builder = self.client.request(request.method, &request.url);

        for (key, value) in &request.headers {
            // reqwest writes the multipart content type itself, with the boundary
            if is_multipart && key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            builder = builder.query(request.query.pairs());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(body) => {
                let form = body
                    .fields()
                    .iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        form.text(name.clone(), value.clone())
                    });
                builder.multipart(form)
            }
        };

        builder.build().map_err(|e| Error::InvalidRequest {
            message: format!("Failed to build request: {}", e),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request = self.build_request(request)?;

        let response = self.client.execute(request).await.map_err(from_request_error)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| body_read_error(status, e))?;

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

/// A body that fails to arrive keeps the status already received
fn body_read_error(status: StatusCode, error: reqwest::Error) -> Error {
    if status.is_success() {
        return from_request_error(error);
    }
    Error::Transport {
        status: status.as_u16(),
        body: error.to_string(),
    }
}

/// Map a reqwest failure to a transport error; no response means status 0
fn from_request_error(error: reqwest::Error) -> Error {
    if error.is_builder() {
        return Error::InvalidRequest {
            message: error.to_string(),
        };
    }
    Error::Transport {
        status: error.status().map(|s| s.as_u16()).unwrap_or(0),
        body: error.to_string(),
    }
}
