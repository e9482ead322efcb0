//! Admin API client with retry and rate limiting
//!
//! Handles:
//! - Automatic retries with configurable backoff
//! - Client-side request pacing
//! - `Retry-After` on 429
//! - REST `Link` pagination headers and GraphQL envelopes

use super::graphql::GraphQlResponse;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::pagination::next_page_info;
use crate::types::{BackoffType, Method};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the Admin API access token
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Configuration for the Admin API client
#[derive(Debug, Clone)]
pub struct AdminClientConfig {
    /// Versioned admin root, e.g. `https://shop.myshopify.com/admin/api/2024-07`
    pub base_url: String,
    /// Access token, sent verbatim
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for AdminClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("shoptable-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AdminClientConfig {
    /// Create a new config builder
    pub fn builder() -> AdminClientConfigBuilder {
        AdminClientConfigBuilder::default()
    }

    /// Derive client settings from the connector configuration
    pub fn from_connector(config: &ConnectorConfig) -> Self {
        Self {
            base_url: config.admin_base_url(),
            access_token: config.access_token.clone(),
            timeout: Duration::from_secs(config.http.timeout_secs),
            max_retries: config.http.max_retries,
            rate_limit: Some(RateLimiterConfig::new(
                config.http.requests_per_second,
                config.http.burst,
            )),
            ..Self::default()
        }
    }
}

/// Builder for client config
#[derive(Default)]
pub struct AdminClientConfigBuilder {
    config: AdminClientConfig,
}

impl AdminClientConfigBuilder {
    /// Set the versioned admin root
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Build the config
    pub fn build(self) -> AdminClientConfig {
        self.config
    }
}

/// Body and pagination cursor of a REST GET
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub body: Value,
    /// `page_info` of the `rel="next"` link, if any
    pub next_page_info: Option<String>,
}

/// Admin API client
pub struct AdminClient {
    client: Client,
    config: AdminClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl AdminClient {
    /// Create a client with the given configuration
    pub fn with_config(config: AdminClientConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &AdminClientConfig {
        &self.config
    }

    /// GET a REST listing or record
    pub async fn rest_get(&self, path: &str, query: &[(String, String)]) -> Result<RestResponse> {
        let url = self.rest_url(path);
        let response = self.execute(Method::GET, &url, query, None).await?;
        let next_page_info = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_info);
        let body = response.json().await?;
        Ok(RestResponse {
            body,
            next_page_info,
        })
    }

    /// POST/PUT/DELETE a REST resource; returns the body when there is one
    pub async fn rest_send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.rest_url(path);
        let response = self.execute(method, &url, &[], body).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Run a GraphQL document
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<GraphQlResponse> {
        let url = self.rest_url("graphql");
        let body = json!({ "query": query, "variables": variables });
        let response = self.execute(Method::POST, &url, &[], Some(&body)).await?;
        let envelope: GraphQlResponse = response.json().await?;
        Ok(envelope)
    }

    /// Send with retries, rate limiting and status classification
    async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self
                .client
                .request(method.into(), url)
                .header("Accept", "application/json");
            if let Some(ref token) = self.config.access_token {
                req = req.header(ACCESS_TOKEN_HEADER, token);
            }
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if attempt < max_retries {
                            warn!(
                                "Rate limited (429), attempt {}/{}, waiting {}s",
                                attempt + 1,
                                max_retries + 1,
                                retry_after
                            );
                            tokio::time::sleep(Duration::from_secs(retry_after)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }

                    if is_retryable_status(status) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(status.as_u16(), ""));
                        continue;
                    }

                    if status.is_client_error() || status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::http_status(status.as_u16(), body));
                    }

                    debug!("Request succeeded: {:?} {}", method, url);
                    return Ok(response);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < max_retries => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        "Request error ({e}), attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    last_error = Some(Error::Http(e));
                }
                Err(e) if e.is_timeout() => {
                    return Err(Error::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    });
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// `<base>/<path>.json`, or the path itself when it is absolute
    fn rest_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.ends_with(".json") {
            format!("{base}/{path}")
        } else {
            format!("{base}/{path}.json")
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("base_url", &self.config.base_url)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Extract retry-after header value (seconds, may be fractional)
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map_or(2, |secs| secs.ceil().max(0.0) as u64)
}
