//! Page Watch - change detection for a single web resource.
//!
//! This crate provides:
//! - Word-level text diffing and tree-aware markup diffing
//! - Pixel-level visual diffing with dimension-mismatch handling
//! - A change orchestrator that reconciles engine results into one verdict
//!   and persists the new baseline
//! - Snapshot stores (in-memory, filesystem)
//! - HTTP fetching, headless browser capture and AI summarizers behind
//!   replaceable traits
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use page_watch::{ChangeMonitor, FsSnapshotStore, HttpContentFetcher, MonitorOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = ChangeMonitor::new(
//!     Arc::new(FsSnapshotStore::new("./page-snapshots")),
//!     Arc::new(HttpContentFetcher::new()?),
//! );
//! let options = MonitorOptions::new("https://example.com", "example").visual(false);
//! let outcome = monitor.run(&options).await?;
//! println!("{}", serde_json::to_string_pretty(&outcome.verdict)?);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod diff;
pub mod fetch;
pub mod logging;
pub mod monitor;
pub mod report;
pub mod snapshot;
pub mod summarize;

// Re-export engines and their types
pub use diff::{
    ChangeKind, ChangeRecord, DiffMode, RasterImage, VisualDiffError, VisualDiffOptions,
    VisualDiffResult, compare_images, compare_png, diff_markup, diff_words, extract_text,
};

// Re-export orchestration
pub use monitor::{
    ChangeMonitor, MonitorError, MonitorOptions, MonitorResult, RunOutcome, RunStatus, RunVerdict,
    VisualMetric,
};

// Re-export collaborators
pub use capture::{BrowserCapturer, BrowserConfig, CaptureError, MockFramebuffer, VisualCapturer};
pub use fetch::{ContentFetcher, FetchError, HttpContentFetcher, PageContent};
pub use snapshot::{
    FsSnapshotStore, MemorySnapshotStore, ResourceSnapshot, SnapshotStore, StoreError,
};
pub use summarize::{Provider, Summarizer, SummaryError};

// Re-export configuration and presentation
pub use config::{ConfigError, MonitorConfig, SummaryInput, SummarySettings};
pub use report::{append_to_feed, render_report};
