//! Tree-aware markup diff.
//!
//! Both documents are parsed leniently and their child lists aligned level by
//! level using subtree signatures. Unmatched nodes of the same kind are
//! compared recursively; everything else is a whole inserted or removed
//! fragment. Records are emitted in document order, with a removal placed
//! before an insertion at the same position.

use std::hash::{DefaultHasher, Hash, Hasher};

use super::parser::{Document, NodeId, NodeKind};
use crate::diff::myers::{self, Edit};
use crate::diff::text::diff_words;
use crate::diff::types::ChangeRecord;

/// Compute the structural fragments inserted into or removed from `previous`.
///
/// Malformed input never fails; both sides are parsed best-effort.
pub fn diff_markup(previous: &str, current: &str) -> Vec<ChangeRecord> {
    let old = Document::parse(previous);
    let new = Document::parse(current);

    let mut delta = Delta {
        old_signatures: signatures(&old),
        new_signatures: signatures(&new),
        old: &old,
        new: &new,
        records: Vec::new(),
    };
    delta.compare_children(Document::ROOT, Document::ROOT);
    delta.records
}

struct Delta<'d, 'a> {
    old: &'d Document<'a>,
    new: &'d Document<'a>,
    old_signatures: Vec<u64>,
    new_signatures: Vec<u64>,
    records: Vec<ChangeRecord>,
}

impl Delta<'_, '_> {
    fn compare_children(&mut self, old_parent: NodeId, new_parent: NodeId) {
        let old_kids = comparable_children(self.old, old_parent);
        let new_kids = comparable_children(self.new, new_parent);

        let old_keys: Vec<u64> = old_kids.iter().map(|&id| self.old_signatures[id]).collect();
        let new_keys: Vec<u64> = new_kids.iter().map(|&id| self.new_signatures[id]).collect();

        let mut removed = Vec::new();
        let mut inserted = Vec::new();
        for edit in myers::diff(&old_keys, &new_keys) {
            match edit {
                Edit::Equal { .. } => {
                    self.resolve_gap(&removed, &inserted);
                    removed.clear();
                    inserted.clear();
                }
                Edit::Delete { old } => removed.push(old_kids[old]),
                Edit::Insert { new } => inserted.push(new_kids[new]),
            }
        }
        self.resolve_gap(&removed, &inserted);
    }

    /// Pair same-kind nodes across a run of unmatched siblings
    fn resolve_gap(&mut self, removed: &[NodeId], inserted: &[NodeId]) {
        let mut next = 0;
        for &old_id in removed {
            let partner = inserted[next..]
                .iter()
                .position(|&new_id| self.same_kind(old_id, new_id));
            match partner {
                Some(offset) => {
                    for &new_id in &inserted[next..next + offset] {
                        self.insertion(new_id);
                    }
                    self.modified(old_id, inserted[next + offset]);
                    next += offset + 1;
                }
                None => self.deletion(old_id),
            }
        }
        for &new_id in &inserted[next..] {
            self.insertion(new_id);
        }
    }

    fn same_kind(&self, old_id: NodeId, new_id: NodeId) -> bool {
        let old = self.old.node(old_id);
        let new = self.new.node(new_id);
        match (&old.kind, &new.kind) {
            (NodeKind::Text, NodeKind::Text) => true,
            (NodeKind::Element { name: a, .. }, NodeKind::Element { name: b, .. }) => a == b,
            _ => false,
        }
    }

    fn modified(&mut self, old_id: NodeId, new_id: NodeId) {
        if self.old.node(old_id).is_text() {
            let changes = diff_words(self.old.inner_markup(old_id), self.new.inner_markup(new_id));
            self.records.extend(changes);
        } else {
            self.compare_children(old_id, new_id);
        }
    }

    fn insertion(&mut self, id: NodeId) {
        self.records.push(ChangeRecord::addition(fragment_value(self.new, id)));
    }

    fn deletion(&mut self, id: NodeId) {
        self.records.push(ChangeRecord::deletion(fragment_value(self.old, id)));
    }
}

/// Inner content of a fragment; outer markup when there is no content
fn fragment_value<'a>(doc: &Document<'a>, id: NodeId) -> &'a str {
    if doc.node(id).is_text() {
        return doc.inner_markup(id).trim();
    }
    let inner = doc.inner_markup(id);
    if inner.trim().is_empty() {
        doc.outer_markup(id)
    } else {
        inner
    }
}

/// Children that take part in the comparison (no comments, declarations or blank text)
fn comparable_children(doc: &Document<'_>, parent: NodeId) -> Vec<NodeId> {
    doc.children(parent)
        .iter()
        .copied()
        .filter(|&id| match doc.node(id).kind {
            NodeKind::Element { .. } => true,
            NodeKind::Text => !doc.inner_markup(id).trim().is_empty(),
            _ => false,
        })
        .collect()
}

/// Subtree signature for every node, whitespace-insensitive for text
fn signatures(doc: &Document<'_>) -> Vec<u64> {
    let mut sigs = vec![0u64; doc.len()];

    // Children always have larger ids than their parent
    for id in (0..doc.len()).rev() {
        let mut hasher = DefaultHasher::new();
        match &doc.node(id).kind {
            NodeKind::Text => {
                "text".hash(&mut hasher);
                for word in doc.inner_markup(id).split_whitespace() {
                    word.hash(&mut hasher);
                }
            }
            NodeKind::Element { name, attributes } => {
                "element".hash(&mut hasher);
                name.hash(&mut hasher);
                attributes.hash(&mut hasher);
                for child in comparable_children(doc, id) {
                    sigs[child].hash(&mut hasher);
                }
            }
            NodeKind::Document => {
                for child in comparable_children(doc, id) {
                    sigs[child].hash(&mut hasher);
                }
            }
            NodeKind::Comment | NodeKind::Declaration => {}
        }
        sigs[id] = hasher.finish();
    }
    sigs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::ChangeKind;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Shop</title></head>
  <body>
    <h1>Catalog</h1>
    <p>Price: <b>$10</b></p>
  </body>
</html>"#;

    #[test]
    fn test_identical_documents() {
        assert!(diff_markup(PAGE, PAGE).is_empty());
    }

    #[test]
    fn test_formatting_and_comments_are_ignored() {
        let reformatted = PAGE
            .replace("\n    ", "\n")
            .replace("<h1>", "<!-- heading --><h1>");
        assert!(diff_markup(PAGE, &reformatted).is_empty());
    }

    #[test]
    fn test_appended_paragraph_is_single_addition() {
        let current = PAGE.replace(
            "</p>\n  </body>",
            "</p>\n    <p>Free <i>shipping</i> today</p>\n  </body>",
        );
        let records = diff_markup(PAGE, &current);
        assert_eq!(
            records,
            vec![ChangeRecord::addition("Free <i>shipping</i> today")]
        );
    }

    #[test]
    fn test_removed_fragment_keeps_inner_markup() {
        let previous = "<ul><li>one</li><li>two <em>2</em></li></ul><div><span>keep</span></div>";
        let current = "<ul><li>one</li></ul><div><span>keep</span></div>";
        let records = diff_markup(previous, current);
        assert_eq!(records, vec![ChangeRecord::deletion("two <em>2</em>")]);
    }

    #[test]
    fn test_text_change_inside_element_is_word_level() {
        let current = PAGE.replace("$10", "$12");
        let records = diff_markup(PAGE, &current);
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("$10"), ChangeRecord::addition("$12")]
        );
    }

    #[test]
    fn test_records_interleave_in_document_order() {
        let previous = "<div><p>first</p><p>second</p></div><section>old</section>";
        let current = "<div><h2>intro</h2><p>first</p><p>second</p></div><section>new</section>";
        let records = diff_markup(previous, current);
        assert_eq!(
            records,
            vec![
                ChangeRecord::addition("intro"),
                ChangeRecord::deletion("old"),
                ChangeRecord::addition("new"),
            ]
        );
    }

    #[test]
    fn test_replaced_element_kind() {
        let previous = "<body><table><tr><td>x</td></tr></table></body>";
        let current = "<body><ol><li>x</li></ol></body>";
        let records = diff_markup(previous, current);
        let kinds: Vec<ChangeKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Deletion, ChangeKind::Addition]);
        assert_eq!(records[0].value, "<tr><td>x</td></tr>");
        assert_eq!(records[1].value, "<li>x</li>");
    }

    #[test]
    fn test_empty_element_uses_outer_markup() {
        let records = diff_markup("<p>a</p>", "<p>a</p><img src=\"logo.png\">");
        assert_eq!(records, vec![ChangeRecord::addition("<img src=\"logo.png\">")]);
    }

    #[test]
    fn test_malformed_markup_does_not_abort() {
        let previous = "<div><p>unclosed <b>bold";
        let current = "<div><p>unclosed <b>bolder</div></span>";
        let records = diff_markup(previous, current);
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("bold"), ChangeRecord::addition("bolder")]
        );
    }

    #[test]
    fn test_attribute_only_change_is_not_reported() {
        let records = diff_markup("<p class=\"a\">x</p>", "<p class=\"b\">x</p>");
        assert!(records.is_empty());
    }
}
