//! Authenticated GitHub REST client.
//!
//! One client instance is shared by every handler. It attaches the caller's
//! bearer token to each request, surfaces non-2xx responses as
//! [`UpstreamError::Status`], and logs the remaining rate-limit quota from
//! each response as observable metadata (logged, never enforced). GET
//! requests go through a bounded LRU of `ETag`s so unchanged resources are
//! answered with a 304 instead of a full body.

mod cache;

pub use cache::{CachedResponse, ResponseCache, DEFAULT_CACHE_CAPACITY};

use reqwest::header::{HeaderMap, ETAG, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, UpstreamError};

/// Public GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Outbound request timeout. The upstream design had none, which turns a
/// slow platform response into unbounded request latency.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared HTTP client with the default timeout and user agent.
pub fn default_http_client(user_agent: &str) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(user_agent)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            field: "http_client".to_string(),
            message: e.to_string(),
        })
}

/// Thin authenticated wrapper over the GitHub REST surface.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<ResponseCache>,
}

impl GitHubClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated GET with conditional-request caching.
    ///
    /// When a cached `ETag` exists for (URL, token scope) the request is
    /// sent with `If-None-Match` and a 304 is answered from the cache
    /// without re-reading the body.
    pub async fn get(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        let url = self.url(path);
        let key = ResponseCache::cache_key(&url, token);
        let cached = self.cache.get(&key);

        let mut request = self.authorized(self.http.get(&url), token);
        if let Some(entry) = &cached {
            request = request.header(IF_NONE_MATCH, entry.etag.clone());
        }

        let response = request.send().await.map_err(Self::network)?;
        log_rate_limit(response.headers(), path);

        if response.status() == StatusCode::NOT_MODIFIED {
            return match cached {
                Some(entry) => {
                    debug!(path, "Serving GET response from conditional cache");
                    Ok(entry.body)
                }
                // Only reachable if the server sends an unsolicited 304.
                None => Err(UpstreamError::Decode {
                    message: "received 304 without a cached entry".to_string(),
                }),
            };
        }

        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = Self::decode_body(response).await?;
        if let Some(etag) = etag {
            self.cache.insert(
                key,
                CachedResponse {
                    etag,
                    body: body.clone(),
                },
            );
        }

        Ok(body)
    }

    /// Authenticated POST with a JSON body.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.send(Method::POST, path, body, token).await
    }

    /// Authenticated PATCH with a JSON body.
    pub async fn patch(
        &self,
        path: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.send(Method::PATCH, path, body, token).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        let url = self.url(path);
        let response = self
            .authorized(self.http.request(method, &url), token)
            .json(body)
            .send()
            .await
            .map_err(Self::network)?;

        log_rate_limit(response.headers(), path);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Self::decode_body(response).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
    }

    fn url(&self, path: &str) -> String {
        let normalized = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url, normalized)
    }

    fn network(error: reqwest::Error) -> UpstreamError {
        UpstreamError::Network {
            message: error.to_string(),
        }
    }

    /// Decode a success response. Empty bodies (204 from workflow-dispatch)
    /// decode to `null`.
    async fn decode_body(response: reqwest::Response) -> Result<Value, UpstreamError> {
        let text = response.text().await.map_err(Self::network)?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| UpstreamError::Decode {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Surface the remaining request quota from a response. Best effort only;
/// enforcement and backoff are out of scope.
fn log_rate_limit(headers: &HeaderMap, path: &str) {
    if let Some(remaining) = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
    {
        debug!(remaining, path, "GitHub requests remaining");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
