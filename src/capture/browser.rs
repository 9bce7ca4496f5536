//! Headless browser capture over the DevTools protocol.
//!
//! Launches a Chromium-compatible binary through `chromiumoxide` with a
//! throwaway profile, loads the page at a fixed viewport width and takes a
//! full-page PNG screenshot. The image is as wide as the viewport and as tall
//! as the rendered document; the viewport height only sets the initial
//! layout. The whole capture is bounded by the configured timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::{CaptureError, CaptureResult, VisualCapturer};
use crate::config::{
    DEFAULT_BROWSER_BINARY, DEFAULT_CAPTURE_TIMEOUT, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};

/// Flags passed to every launch on top of the extra `args`
const LAUNCH_ARGS: &[&str] = &[
    "--disable-gpu",
    "--hide-scrollbars",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
];

/// Configuration for headless browser capture
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Browser executable (name on PATH or absolute path)
    pub binary: PathBuf,
    /// Viewport width in pixels; the width of every capture
    pub viewport_width: u32,
    /// Initial viewport height in pixels
    pub viewport_height: u32,
    /// Upper bound on launch, navigation and screenshot together
    pub timeout: Duration,
    /// Extra browser flags
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BROWSER_BINARY),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            timeout: Duration::from_secs(DEFAULT_CAPTURE_TIMEOUT),
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Default::default()
        }
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// All flags for a launch
    fn launch_args(&self) -> Vec<String> {
        LAUNCH_ARGS
            .iter()
            .map(|arg| arg.to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    fn page_viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        }
    }

    /// Launch settings using `profile` as the user data directory
    fn chrome_config(&self, profile: &std::path::Path) -> CaptureResult<ChromeConfig> {
        ChromeConfig::builder()
            .chrome_executable(&self.binary)
            .user_data_dir(profile)
            .window_size(self.viewport_width, self.viewport_height)
            .viewport(self.page_viewport())
            .no_sandbox()
            .launch_timeout(self.timeout)
            .request_timeout(self.timeout)
            .args(self.launch_args())
            .build()
            .map_err(|reason| CaptureError::Launch {
                binary: self.binary.clone(),
                reason,
            })
    }
}

/// Full-page screenshot settings
fn screenshot_params() -> ScreenshotParams {
    ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .build()
}

/// Captures pages with a headless browser
#[derive(Debug, Clone, Default)]
pub struct BrowserCapturer {
    config: BrowserConfig,
}

impl BrowserCapturer {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    async fn capture_page(&self, url: &str) -> CaptureResult<Vec<u8>> {
        let profile = tempfile::tempdir()?;
        let chrome = self.config.chrome_config(profile.path())?;

        debug!(binary = %self.config.binary.display(), "Launching browser");
        let (mut browser, mut handler) =
            Browser::launch(chrome)
                .await
                .map_err(|e| CaptureError::Launch {
                    binary: self.config.binary.clone(),
                    reason: e.to_string(),
                })?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event failed");
                }
            }
        });

        let result = screenshot(&browser, url).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "Browser process did not exit cleanly");
        }
        events.abort();

        result
    }
}

async fn screenshot(browser: &Browser, url: &str) -> CaptureResult<Vec<u8>> {
    let page = browser.new_page(url).await?;
    page.wait_for_navigation().await?;
    let png = page.screenshot(screenshot_params()).await?;
    if png.is_empty() {
        return Err(CaptureError::MissingOutput);
    }
    Ok(png)
}

#[async_trait]
impl VisualCapturer for BrowserCapturer {
    async fn capture(&self, url: &str) -> CaptureResult<Vec<u8>> {
        let png = tokio::time::timeout(self.config.timeout, self.capture_page(url))
            .await
            .map_err(|_| CaptureError::Timeout(self.config.timeout))??;

        info!(
            url,
            bytes = png.len(),
            width = self.config.viewport_width,
            "Captured full-page screenshot"
        );
        Ok(png)
    }

    fn source_type(&self) -> &str {
        "browser"
    }
}
