// Core types shared by the text and structural diff engines

use serde::{Deserialize, Serialize};

/// Direction of a detected difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in the current state only
    Addition,
    /// Present in the previous state only
    Deletion,
}

impl ChangeKind {
    /// The opposite direction, as seen when the inputs are swapped
    pub fn inverse(self) -> Self {
        match self {
            ChangeKind::Addition => ChangeKind::Deletion,
            ChangeKind::Deletion => ChangeKind::Addition,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Addition => write!(f, "addition"),
            ChangeKind::Deletion => write!(f, "deletion"),
        }
    }
}

/// One unit of detected difference.
///
/// Records keep the order in which they occur in the compared documents;
/// no engine sorts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Whether the span was added or removed
    pub kind: ChangeKind,

    /// The changed text, or the inner markup of a changed fragment
    pub value: String,
}

impl ChangeRecord {
    pub fn addition(value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Addition,
            value: value.into(),
        }
    }

    pub fn deletion(value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Deletion,
            value: value.into(),
        }
    }

    pub fn is_addition(&self) -> bool {
        self.kind == ChangeKind::Addition
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == ChangeKind::Deletion
    }
}

/// Which engine compares the text/markup pair of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Word-level diff of the extracted text
    #[default]
    Text,
    /// Tree-aware diff of the raw markup
    Markup,
}

impl DiffMode {
    /// Parse a mode name ("text", "markup", or the alias "html")
    pub fn from_str(mode: &str) -> Option<Self> {
        match mode.trim().to_lowercase().as_str() {
            "text" => Some(DiffMode::Text),
            "markup" | "html" | "structural" => Some(DiffMode::Markup),
            _ => None,
        }
    }

    pub fn keeps_markup(self) -> bool {
        self == DiffMode::Markup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_record_serializes_lowercase_kind() {
        let json = serde_json::to_value(ChangeRecord::addition("$12")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "addition", "value": "$12"}));
    }

    #[test]
    fn test_diff_mode_aliases() {
        assert_eq!(DiffMode::from_str("TEXT"), Some(DiffMode::Text));
        assert_eq!(DiffMode::from_str("html"), Some(DiffMode::Markup));
        assert_eq!(DiffMode::from_str("structural"), Some(DiffMode::Markup));
        assert_eq!(DiffMode::from_str("pixels"), None);
    }

    #[test]
    fn test_kind_inverse() {
        assert_eq!(ChangeKind::Addition.inverse(), ChangeKind::Deletion);
        assert_eq!(ChangeKind::Deletion.inverse(), ChangeKind::Addition);
    }
}
