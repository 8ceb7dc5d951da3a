//! Request shaping for list endpoints and form uploads
//!
//! Turns pagination, ordering and filter arguments into query pairs, and
//! flat field maps into multipart bodies. Nothing in here fails at runtime;
//! a `Page` with `row == 0` is a caller bug and is encoded as given.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::request::{ApiRequest, RequestBody};

/// Query value sent instead of `row`/`page` when pagination is disabled
pub const PAGINATION_DISABLED: &str = "false";

/// Pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Rows per page, must be positive
    pub row: u32,
    /// Zero-based page index
    pub page: u32,
}

impl Page {
    pub fn new(row: u32, page: u32) -> Self {
        Self { row, page }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Ordering request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub order_by: String,
    pub order_type: SortOrder,
}

impl Sort {
    pub fn asc(order_by: impl Into<String>) -> Self {
        Self {
            order_by: order_by.into(),
            order_type: SortOrder::Asc,
        }
    }

    pub fn desc(order_by: impl Into<String>) -> Self {
        Self {
            order_by: order_by.into(),
            order_type: SortOrder::Desc,
        }
    }
}

/// A single filter value: one scalar, or an ordered list sent as repeated keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::Sequence(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        FilterValue::Sequence(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FilterValue {
    fn from(values: [&str; N]) -> Self {
        FilterValue::Sequence(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Field filters for list endpoints, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    fields: BTreeMap<String, FilterValue>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field filter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.fields.iter()
    }
}

/// Ordered query pairs; keys may repeat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in insertion order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Render as an `application/x-www-form-urlencoded` query string
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    /// Parse a query string produced by [`QueryParams::to_query_string`]
    pub fn parse(query: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }
}

/// Flat multipart form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
}

impl MultipartBody {
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Encode list arguments into query pairs.
///
/// Pagination and the `pagination=false` marker are mutually exclusive.
pub fn encode_query(
    pagination: Option<&Page>,
    ordering: Option<&Sort>,
    filter: Option<&Filter>,
) -> QueryParams {
    let mut params = QueryParams::new();

    match pagination {
        Some(page) => {
            params.append("row", page.row.to_string());
            params.append("page", page.page.to_string());
        }
        None => params.append("pagination", PAGINATION_DISABLED),
    }

    if let Some(sort) = ordering {
        params.append("order_by", sort.order_by.clone());
        params.append("order_type", sort.order_type.as_str());
    }

    if let Some(filter) = filter {
        for (key, value) in filter.iter() {
            match value {
                FilterValue::Scalar(v) => params.append(key.clone(), v.clone()),
                FilterValue::Sequence(values) => {
                    for v in values {
                        params.append(key.clone(), v.clone());
                    }
                }
            }
        }
    }

    params
}

/// Encode flat key/value pairs as multipart text fields, one per pair
pub fn encode_multipart<I, K, V>(fields: I) -> MultipartBody
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    MultipartBody {
        fields: fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    }
}

/// Encode a JSON object as multipart fields.
///
/// Strings are sent verbatim; every other value is sent as its compact JSON
/// text. Nested values are not expanded.
pub fn encode_multipart_json(object: &Map<String, Value>) -> MultipartBody {
    encode_multipart(object.iter().map(|(key, value)| {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (key.clone(), text)
    }))
}

/// Builds `ApiRequest` values rooted at the configured API base URL
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
}

impl RequestBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// Prefix `path` with the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Build a request for `method` on `path`
    pub fn build(&self, method: Method, path: &str, query: QueryParams, body: RequestBody) -> ApiRequest {
        let mut request = ApiRequest::new(method, self.url(path));
        if let Some(content_type) = body.content_type() {
            request.set_header("Content-Type", content_type);
        }
        request.query = query;
        request.body = body;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pagination_emits_marker() {
        let params = encode_query(None, None, None);
        assert_eq!(params.pairs(), &[("pagination".to_string(), "false".to_string())]);
        assert!(!params.contains_key("row"));
        assert!(!params.contains_key("page"));
    }

    #[test]
    fn test_pagination_emits_row_and_page() {
        let params = encode_query(Some(&Page::new(25, 0)), None, None);
        assert_eq!(params.get("row"), Some("25"));
        assert_eq!(params.get("page"), Some("0"));
        assert!(!params.contains_key("pagination"));
    }

    #[test]
    fn test_ordering() {
        let params = encode_query(None, Some(&Sort::desc("created_at")), None);
        assert_eq!(params.get("order_by"), Some("created_at"));
        assert_eq!(params.get("order_type"), Some("desc"));
    }

    #[test]
    fn test_sequence_filter_repeats_key_in_order() {
        let filter = Filter::new()
            .with("status", ["open", "closed", "archived"])
            .with("owner", "me");
        let params = encode_query(Some(&Page::new(10, 1)), None, Some(&filter));

        assert_eq!(params.get_all("status"), vec!["open", "closed", "archived"]);
        assert_eq!(params.get_all("owner"), vec!["me"]);
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_empty_filter_emits_nothing() {
        let params = encode_query(Some(&Page::new(10, 1)), None, Some(&Filter::new()));
        assert_eq!(params.len(), 2);

        let params = encode_query(
            Some(&Page::new(10, 1)),
            None,
            Some(&Filter::new().with("tag", Vec::<String>::new())),
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_query_string_round_trip() {
        let filter = Filter::new().with("tag", ["a", "b"]);
        let params = encode_query(Some(&Page::new(10, 2)), Some(&Sort::asc("name")), Some(&filter));

        let rendered = params.to_query_string();
        assert_eq!(rendered, "row=10&page=2&order_by=name&order_type=asc&tag=a&tag=b");
        assert_eq!(QueryParams::parse(&rendered), params);
    }

    #[test]
    fn test_query_string_escapes_values() {
        let filter = Filter::new().with("q", "a&b c");
        let params = encode_query(None, None, Some(&filter));
        let parsed = QueryParams::parse(&params.to_query_string());
        assert_eq!(parsed.get("q"), Some("a&b c"));
    }

    #[test]
    fn test_multipart_json_flattens_scalars() {
        let object = serde_json::json!({
            "title": "Receipt",
            "amount": 12.5,
            "paid": true,
            "note": null,
            "tags": ["a", "b"]
        });
        let body = encode_multipart_json(object.as_object().unwrap());

        assert_eq!(body.len(), 5);
        let field = |name: &str| {
            body.fields()
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(field("title"), "Receipt");
        assert_eq!(field("amount"), "12.5");
        assert_eq!(field("paid"), "true");
        assert_eq!(field("note"), "null");
        assert_eq!(field("tags"), r#"["a","b"]"#);
    }

    #[test]
    fn test_url_joining() {
        let builder = RequestBuilder::new("https://api.example.com/v1/");
        assert_eq!(builder.url("/users"), "https://api.example.com/v1/users");
        assert_eq!(builder.url("users"), "https://api.example.com/v1/users");

        let builder = RequestBuilder::new("https://api.example.com");
        assert_eq!(builder.url("/users/7"), "https://api.example.com/users/7");
    }

    #[test]
    fn test_build_sets_content_type() {
        let builder = RequestBuilder::new("https://api.example.com");
        let request = builder.build(
            Method::POST,
            "/uploads",
            QueryParams::new(),
            RequestBody::Multipart(encode_multipart([("name", "scan.png")])),
        );
        assert_eq!(request.header("content-type"), Some("multipart/form-data"));

        let request = builder.build(Method::DELETE, "/uploads/1", QueryParams::new(), RequestBody::Empty);
        assert_eq!(request.header("content-type"), None);
    }
}
