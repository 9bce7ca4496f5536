// Verdict and option types for monitoring runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::diff::{ChangeRecord, DiffMode, VisualDiffOptions};
use crate::fetch::FetchError;
use crate::snapshot::StoreError;

/// Result type for monitoring runs
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failures that abort a monitoring run.
///
/// Visual comparison and summary failures are not here: they are
/// recovered inside the run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// A diff worker panicked or was cancelled
    #[error("diff worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Outcome category of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// No baseline existed; the current state became the baseline
    InitialRun,
    /// Baseline existed and nothing changed
    NoChange,
    /// At least one engine reported a difference
    Changed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::InitialRun => write!(f, "INITIAL_RUN"),
            RunStatus::NoChange => write!(f, "NO_CHANGE"),
            RunStatus::Changed => write!(f, "CHANGED"),
        }
    }
}

/// Sentinel written when no visual comparison produced a count
pub const NOT_COMPARABLE: &str = "not_comparable";

/// Result of the visual engine as reported in a verdict.
///
/// Serializes as the pixel count, or as the string `"not_comparable"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualMetric {
    /// Number of differing pixels
    Compared(u64),
    /// No comparison ran (first run, visual disabled, missing or unreadable image)
    #[default]
    NotComparable,
}

impl VisualMetric {
    pub fn pixels(self) -> Option<u64> {
        match self {
            VisualMetric::Compared(n) => Some(n),
            VisualMetric::NotComparable => None,
        }
    }
}

impl Serialize for VisualMetric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            VisualMetric::Compared(n) => serializer.serialize_u64(*n),
            VisualMetric::NotComparable => serializer.serialize_str(NOT_COMPARABLE),
        }
    }
}

impl<'de> Deserialize<'de> for VisualMetric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct VisualMetricVisitor;

        impl Visitor<'_> for VisualMetricVisitor {
            type Value = VisualMetric;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a pixel count or \"{}\"", NOT_COMPARABLE)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<VisualMetric, E> {
                Ok(VisualMetric::Compared(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<VisualMetric, E> {
                u64::try_from(value)
                    .map(VisualMetric::Compared)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<VisualMetric, E> {
                if value == NOT_COMPARABLE {
                    Ok(VisualMetric::NotComparable)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_any(VisualMetricVisitor)
    }
}

/// Reconciled result of one monitoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunVerdict {
    /// Monitored resource
    pub url: String,
    /// Snapshot key the run read and wrote
    pub key: String,
    /// When the run started
    pub checked_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Whether any engine reported a difference
    pub changed: bool,
    /// Text or structural changes in document order
    pub changes: Vec<ChangeRecord>,
    pub visual_difference_metric: VisualMetric,
    /// Summary text, or a description of why summarizing failed
    pub summary: Option<String>,
}

impl RunVerdict {
    /// A verdict for a run with no baseline
    pub fn initial(url: impl Into<String>, key: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            checked_at,
            status: RunStatus::InitialRun,
            changed: false,
            changes: Vec::new(),
            visual_difference_metric: VisualMetric::NotComparable,
            summary: None,
        }
    }

    /// Record the text/structural engine result
    pub(crate) fn apply_changes(&mut self, changes: Vec<ChangeRecord>) {
        if changes.is_empty() {
            self.status = RunStatus::NoChange;
        } else {
            self.changed = true;
            self.status = RunStatus::Changed;
            self.changes = changes;
        }
    }

    /// Record the visual engine result; a positive count forces a change
    pub(crate) fn apply_visual(&mut self, pixel_count: u64) {
        self.visual_difference_metric = VisualMetric::Compared(pixel_count);
        if pixel_count > 0 {
            self.changed = true;
            self.status = RunStatus::Changed;
        }
    }
}

/// Output of a run: the verdict plus artifacts for reporting
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub verdict: RunVerdict,
    /// PNG difference image, when the visual engine found differences
    pub diff_image: Option<Vec<u8>>,
}

/// Per-run options for the orchestrator
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Resource to monitor
    pub url: String,
    /// Snapshot key
    pub key: String,
    /// Text or structural diffing
    pub diff_mode: DiffMode,
    /// Capture and compare rasters
    pub visual: bool,
    /// Summarize detected changes
    pub summarize: bool,
    /// Visual engine tuning
    pub visual_options: VisualDiffOptions,
}

impl MonitorOptions {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            diff_mode: DiffMode::default(),
            visual: true,
            summarize: false,
            visual_options: VisualDiffOptions::default(),
        }
    }

    pub fn diff_mode(mut self, mode: DiffMode) -> Self {
        self.diff_mode = mode;
        self
    }

    pub fn visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    pub fn summarize(mut self, summarize: bool) -> Self {
        self.summarize = summarize;
        self
    }

    pub fn visual_options(mut self, options: VisualDiffOptions) -> Self {
        self.visual_options = options;
        self
    }
}
