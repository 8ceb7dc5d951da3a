//! Transport-agnostic request and response values
//!
//! The client builds `ApiRequest` values, runs them through the interceptor
//! pipeline and hands them to a [`Transport`](crate::http::Transport). The
//! transport answers with an `ApiResponse` that reaches the caller untouched.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::builder::{MultipartBody, QueryParams};

/// Content type declared for JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type declared for multipart bodies
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

impl RequestBody {
    /// Content type the body is declared with, if it has one
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(_) => Some(CONTENT_TYPE_JSON),
            RequestBody::Multipart(_) => Some(CONTENT_TYPE_MULTIPART),
        }
    }
}

/// An HTTP request described as plain data
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: QueryParams,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: QueryParams::new(),
            body: RequestBody::Empty,
        }
    }

    /// Look up a header value, ignoring ASCII case of the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value with the same name
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Host component of the request URL
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

/// An HTTP response described as plain data
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}
