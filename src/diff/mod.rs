//! Comparison engines.
//!
//! All engines are pure, synchronous functions over their inputs:
//! - [`diff_words`] - word-level text diff
//! - [`diff_markup`] - structural markup diff
//! - [`compare_images`] / [`compare_png`] - pixel-level visual diff

pub mod markup;
mod myers;
pub mod text;
pub mod types;
pub mod visual;

pub use markup::{diff_markup, extract_text};
pub use text::diff_words;
pub use types::{ChangeKind, ChangeRecord, DiffMode};
pub use visual::{
    DEFAULT_THRESHOLD, RasterImage, VisualDiff, VisualDiffError, VisualDiffOptions, VisualDiffResult,
    compare_images, compare_png,
};
