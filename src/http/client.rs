//! Bundled reqwest-backed requester
//!
//! Performs exactly one request per call, with token bucket rate limiting
//! applied before the send. Retry policy lives with the retriever, driven
//! by error classification, so this client never loops.

use super::rate_limit::{RateLimit, RateLimitConfig};
use super::types::{DecodedResponse, Requester, RequestSpec};
use crate::error::{Error, Result};
use crate::types::StringMap;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Configuration for the bundled HTTP requester
#[derive(Debug, Clone)]
pub struct HttpRequesterConfig {
    /// Base URL that path-only requests are resolved against
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// Rate limiter configuration (None disables limiting)
    pub rate_limit: Option<RateLimitConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpRequesterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            default_headers: StringMap::new(),
            rate_limit: Some(RateLimitConfig::default()),
            user_agent: format!("syncline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpRequesterConfig {
    /// Create a config with a base URL
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self {
            base_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a default header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the rate limit
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    #[must_use]
    pub fn no_rate_limit(mut self) -> Self {
        self.rate_limit = None;
        self
    }
}

/// HTTP requester backed by reqwest
pub struct HttpRequester {
    client: Client,
    config: HttpRequesterConfig,
    rate_limit: Option<RateLimit>,
}

impl HttpRequester {
    /// Create a requester with default configuration
    pub fn new() -> Self {
        Self::with_config(HttpRequesterConfig::default())
    }

    /// Create a requester with custom configuration
    pub fn with_config(config: HttpRequesterConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_default();

        let rate_limit = config.rate_limit.as_ref().map(RateLimit::new);

        Self {
            client,
            config,
            rate_limit,
        }
    }

    /// Resolve a path against the base URL
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }
}

impl Default for HttpRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn send(&self, request: &RequestSpec) -> Result<DecodedResponse> {
        if let Some(ref limit) = self.rate_limit {
            limit.acquire().await;
        }

        let url = self.build_url(&request.url);
        let mut req = self.client.request(request.method.into(), &url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers: StringMap = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        debug!(%url, status, "request completed");

        Ok(DecodedResponse {
            status,
            headers,
            body,
            text,
        })
    }
}

impl std::fmt::Debug for HttpRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequester")
            .field("config", &self.config)
            .field("has_rate_limit", &self.rate_limit.is_some())
            .finish_non_exhaustive()
    }
}
