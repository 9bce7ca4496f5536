// Core types for snapshot persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Last-known state of a monitored resource.
///
/// A snapshot always carries the normalized text. Markup and image are
/// independently optional and present only when the matching engine was
/// enabled for the run that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Normalized plain text (whitespace collapsed, block-aware)
    pub text: String,

    /// Raw markup document, kept for structural diffing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,

    /// PNG capture, kept for visual diffing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    /// When the snapshot was written
    pub saved_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// Create a text-only snapshot stamped with the current time
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
            image: None,
            saved_at: Utc::now(),
        }
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(markup.into());
        self
    }

    pub fn with_image(mut self, png: Vec<u8>) -> Self {
        self.image = Some(png);
        self
    }

    pub fn saved_at(mut self, at: DateTime<Utc>) -> Self {
        self.saved_at = at;
        self
    }
}

/// Result type for snapshot store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by snapshot stores.
///
/// Every variant is fatal to a monitoring run; stores never retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("snapshot store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded as JSON
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data exists but is unusable
    #[error("corrupt snapshot for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Backend cannot be reached
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
