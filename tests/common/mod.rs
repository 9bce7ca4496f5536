//! Shared fakes for integration tests

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use page_watch::capture::{CaptureError, CaptureResult, MockFramebuffer, VisualCapturer};
use page_watch::fetch::{ContentFetcher, FetchError, FetchResult, PageContent};
use page_watch::snapshot::{ResourceSnapshot, SnapshotStore, StoreError, StoreResult};
use page_watch::summarize::{Provider, SummaryError, SummaryResult, Summarizer};

/// Fetcher serving a document that tests can swap between runs
pub struct StaticFetcher {
    markup: Mutex<Option<String>>,
}

impl StaticFetcher {
    pub fn new(markup: &str) -> Self {
        Self {
            markup: Mutex::new(Some(markup.to_string())),
        }
    }

    /// A fetcher whose every request fails
    pub fn failing() -> Self {
        Self {
            markup: Mutex::new(None),
        }
    }

    pub fn set(&self, markup: &str) {
        *self.markup.lock().unwrap() = Some(markup.to_string());
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        match self.markup.lock().unwrap().clone() {
            Some(markup) => Ok(PageContent::from_markup(markup)),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            }),
        }
    }
}

/// Capturer returning a framebuffer that tests can swap between runs
pub struct SwappableCapturer {
    frame: Mutex<Option<MockFramebuffer>>,
}

impl SwappableCapturer {
    pub fn new(frame: MockFramebuffer) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
        }
    }

    pub fn failing() -> Self {
        Self {
            frame: Mutex::new(None),
        }
    }

    pub fn set(&self, frame: MockFramebuffer) {
        *self.frame.lock().unwrap() = Some(frame);
    }
}

#[async_trait]
impl VisualCapturer for SwappableCapturer {
    async fn capture(&self, _url: &str) -> CaptureResult<Vec<u8>> {
        let frame = self.frame.lock().unwrap().clone();
        match frame {
            Some(frame) => frame.to_png(),
            None => Err(CaptureError::MissingOutput),
        }
    }

    fn source_type(&self) -> &str {
        "swappable"
    }
}

/// Summarizer returning a canned answer and recording every prompt
pub struct RecordingSummarizer {
    reply: Result<String, u16>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingSummarizer {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A summarizer whose provider answers with the given HTTP status
    pub fn rejecting(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    fn provider_name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "test-model"
    }

    async fn summarize(&self, prompt: &str) -> SummaryResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(SummaryError::Upstream {
                provider: Provider::OpenAi,
                status: *status,
                body: "quota exceeded".to_string(),
            }),
        }
    }
}

/// Store that is never reachable
pub struct UnreachableStore;

#[async_trait]
impl SnapshotStore for UnreachableStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<ResourceSnapshot>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _snapshot: &ResourceSnapshot) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put_diff_image(&self, _key: &str, _png: &[u8]) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get_diff_image(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// A simple product page with the given price
pub fn product_page(price: &str) -> String {
    format!(
        "<html><head><title>Widget</title></head><body>\
         <nav>Home | Shop</nav>\
         <h1>Widget</h1><p>Price: {}</p>\
         <footer>(c) Widget Co</footer></body></html>",
        price
    )
}

/// A white frame with a dark header bar
pub fn frame(width: u32, height: u32) -> MockFramebuffer {
    let mut fb = MockFramebuffer::with_color(width, height, [255, 255, 255]);
    fb.draw_rect(0, 0, width, 20, [40, 40, 40]);
    fb
}
