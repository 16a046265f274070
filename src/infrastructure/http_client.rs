//! HTTP fetcher with rate limiting and retry
//!
//! Implements [`FetchPort`] over reqwest. Every source gets its own
//! [`HttpFetcher`] (own connection pool, own limiter) so a slow source never
//! holds up the others.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::fetch_port::{FetchError, FetchKind, FetchPort, FetchRequest, FetchResponse};

/// HTTP client configuration for source fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    /// 0 disables rate limiting.
    pub max_requests_per_second: u32,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-IN,en;q=0.9".to_string(),
            timeout_seconds: 20,
            max_requests_per_second: 2,
            max_attempts: 2,
            retry_base_delay_ms: 500,
            follow_redirects: true,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    config: HttpClientConfig,
    context_label: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid accept-language")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|per_second| RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            rate_limiter,
            config,
            context_label: None,
        })
    }

    /// Set a human-readable context label for logging provenance
    #[must_use]
    pub fn with_context_label(mut self, label: &str) -> Self {
        self.context_label = Some(label.to_string());
        self
    }

    fn label(&self) -> &str {
        self.context_label.as_deref().unwrap_or("http")
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt - 1), saturating.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.config.retry_base_delay_ms.saturating_mul(factor))
    }

    async fn fetch_once(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = request.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }

        let response = builder.send().await.map_err(|e| classify_error(&request.url, &e))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Server {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(&request.url, &e))?;
        Ok(FetchResponse {
            status: status.as_u16(),
            body,
            content_type,
        })
    }
}

fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if error.is_builder() {
        FetchError::InvalidRequest {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl FetchPort for HttpFetcher {
    /// GET with bounded retry and exponential backoff on transient failures.
    ///
    /// A server error that persists through every attempt is returned as a
    /// non-success response, not an error.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.kind == FetchKind::RenderedText {
            return Err(FetchError::RendererUnavailable {
                url: request.url.clone(),
            });
        }

        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            info!("🌐 HTTP GET (attempt {}/{}) [{}]: {}", attempt, attempts, self.label(), request.url);
            match self.fetch_once(request).await {
                Ok(response) => {
                    debug!("Fetched {} ({} bytes, status {})", request.url, response.body.len(), response.status);
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("⚠️ Attempt {} failed for {}: {}", attempt, request.url, e);
                    sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(FetchError::Server { status, .. }) => {
                    warn!("❌ HTTP error {} after {} attempts: {}", status, attempt, request.url);
                    return Ok(FetchResponse {
                        status,
                        body: String::new(),
                        content_type: None,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
