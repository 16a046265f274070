//! Fetch port: the only I/O seam a source adapter talks to.
//!
//! The shipped implementation is [`HttpFetcher`](super::http_client::HttpFetcher).
//! Rendered-text fetches share the same request/response shape but need an
//! external renderer; tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::parsing::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Plain HTTP GET of the page source.
    Http,
    /// Visible text after the page has rendered in a browser.
    RenderedText,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub kind: FetchKind,
    /// Wait after the page loads before reading it (rendered fetches only).
    pub settle_delay: Option<Duration>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, kind: FetchKind) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            cookies: Vec::new(),
            kind,
            settle_delay: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Cookies rendered as a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: None,
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Tag the body with the payload kind the extraction tiers expect.
    pub fn into_payload(self, kind: FetchKind) -> Payload {
        if kind == FetchKind::RenderedText {
            return Payload::Text(self.body);
        }
        let declared_json = self
            .content_type
            .as_deref()
            .is_some_and(|content_type| content_type.contains("json"));
        let looks_json = matches!(self.body.trim_start().chars().next(), Some('{' | '['));
        if declared_json || looks_json {
            Payload::Json(self.body)
        } else {
            Payload::Html(self.body)
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Server error {status} from {url}")]
    Server { url: String, status: u16 },

    #[error("Invalid request for {url}: {message}")]
    InvalidRequest { url: String, message: String },

    #[error("No renderer configured for {url}")]
    RendererUnavailable { url: String },
}

impl FetchError {
    /// Transient failures are retried by the HTTP fetcher.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. } | Self::Server { .. })
    }
}

#[async_trait]
pub trait FetchPort: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}
