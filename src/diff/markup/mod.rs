//! Markup parsing, structural diffing and text extraction.

pub mod extract;
pub mod parser;
pub mod structural;

pub use extract::{decode_entities, extract_text};
pub use parser::{Document, Node, NodeId, NodeKind};
pub use structural::diff_markup;
