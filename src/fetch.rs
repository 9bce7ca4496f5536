//! Content acquisition over HTTP.
//!
//! The fetcher downloads the raw document and derives its normalized text
//! with [`extract_text`], so both the text and the structural engine can be
//! fed from a single request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DEFAULT_FETCH_TIMEOUT, USER_AGENT};
use crate::diff::extract_text;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised while fetching a resource
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Current textual state of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Normalized, block-aware plain text
    pub text: String,
    /// Raw document as served
    pub markup: String,
}

impl PageContent {
    /// Build content from a raw document, extracting its text
    pub fn from_markup(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Self {
            text: extract_text(&markup),
            markup,
        }
    }
}

/// Produces the current text and markup of a resource
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent>;
}

/// Fetches documents with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: Client,
}

impl HttpContentFetcher {
    /// Fetcher with the default request timeout
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT))
    }

    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        debug!(url, "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let markup = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        let content = PageContent::from_markup(markup);
        info!(
            url,
            markup_bytes = content.markup.len(),
            text_chars = content.text.chars().count(),
            "Fetched page"
        );
        Ok(content)
    }
}
