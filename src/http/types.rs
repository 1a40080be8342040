//! Request and response types plus the requester seam

use crate::error::Result;
use crate::types::{JsonObject, JsonValue, StringMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully assembled outgoing request.
///
/// The retriever builds one of these per page by layering fragments from
/// the paginator and the cursor onto the stream's base request.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// HTTP method
    pub method: HttpMethod,
    /// Full URL, or a path resolved against the requester's base URL
    pub url: String,
    /// Query parameters
    pub query: StringMap,
    /// Request headers
    pub headers: StringMap,
    /// JSON request body
    pub body: Option<JsonValue>,
}

impl RequestSpec {
    /// Create a GET request for a URL or path
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a POST request for a URL or path
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Merge query parameter fragments into this request
    pub fn apply_params(&mut self, params: StringMap) {
        self.query.extend(params);
    }

    /// Merge header fragments into this request
    pub fn apply_headers(&mut self, headers: StringMap) {
        self.headers.extend(headers);
    }

    /// Merge JSON body fields into this request
    pub fn apply_body_json(&mut self, fields: JsonObject) {
        if fields.is_empty() {
            return;
        }
        let body = self
            .body
            .get_or_insert_with(|| JsonValue::Object(JsonObject::new()));
        if let JsonValue::Object(map) = body {
            map.extend(fields);
        }
    }

    /// Replace the URL (used when pagination hands back a full next-page URL)
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }
}

/// A decoded HTTP response.
///
/// The body is parsed as JSON when possible; the raw text is kept for
/// non-JSON payloads such as JSONL job downloads.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercased names)
    pub headers: StringMap,
    /// Response body parsed as JSON, or `Null` if it did not parse
    pub body: JsonValue,
    /// Raw response text
    pub text: String,
}

impl DecodedResponse {
    /// Build a response (used widely by tests and mock requesters)
    pub fn new(status: u16, body: JsonValue) -> Self {
        let text = body.to_string();
        Self {
            status,
            headers: StringMap::new(),
            body,
            text,
        }
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header by lowercased name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The seam between the retriever and the network.
///
/// One call performs exactly one request; non-2xx statuses come back as
/// `Ok` responses so the error handler can classify them. Only transport
/// failures (connect, timeout) surface as `Err`.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Send the request and decode the response
    async fn send(&self, request: &RequestSpec) -> Result<DecodedResponse>;
}
