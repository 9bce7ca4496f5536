//! Visual capture of a resource.
//!
//! - [`BrowserCapturer`] takes full-page screenshots with a headless
//!   Chromium-compatible browser
//! - [`MockFramebuffer`] draws captures programmatically for tests and demos

pub mod browser;
pub mod mock;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use browser::{BrowserCapturer, BrowserConfig};
pub use mock::MockFramebuffer;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors raised while capturing a resource
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The browser could not be configured or started
    #[error("failed to launch '{}': {reason}", binary.display())]
    Launch { binary: PathBuf, reason: String },

    /// The capture did not finish in time
    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    /// Navigation or screenshot failed inside the browser
    #[error("browser protocol error: {0}")]
    Protocol(#[from] chromiumoxide::error::CdpError),

    /// The browser finished but produced no image
    #[error("browser produced no screenshot")]
    MissingOutput,

    /// The capture could not be encoded as PNG
    #[error("failed to encode capture: {0}")]
    Encode(String),

    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a PNG raster of the current visual state of a resource
#[async_trait]
pub trait VisualCapturer: Send + Sync {
    /// Capture `url` and return PNG bytes
    async fn capture(&self, url: &str) -> CaptureResult<Vec<u8>>;

    /// Source identifier, e.g. "browser" or "mock"
    fn source_type(&self) -> &str;
}
