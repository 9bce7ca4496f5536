//! Word-level text diff.
//!
//! Words are maximal runs of non-whitespace. Whitespace only separates words,
//! so re-flowed text with the same words produces no records.

use std::ops::Range;

use super::myers::{self, Edit};
use super::types::ChangeRecord;

/// Compute the word-level changes that turn `previous` into `current`.
///
/// Each run of consecutive non-matching words yields at most one deletion
/// followed by at most one addition. Values are verbatim slices of the
/// inputs, so whitespace between changed words is preserved.
pub fn diff_words(previous: &str, current: &str) -> Vec<ChangeRecord> {
    let old_spans = word_spans(previous);
    let new_spans = word_spans(current);

    let old_words: Vec<&str> = old_spans.iter().map(|r| &previous[r.clone()]).collect();
    let new_words: Vec<&str> = new_spans.iter().map(|r| &current[r.clone()]).collect();

    let mut hunk = Hunk::default();
    let mut records = Vec::new();

    for edit in myers::diff(&old_words, &new_words) {
        match edit {
            Edit::Equal { .. } => hunk.flush(previous, &old_spans, current, &new_spans, &mut records),
            Edit::Delete { old } => hunk.deleted = extend(hunk.deleted, old),
            Edit::Insert { new } => hunk.inserted = extend(hunk.inserted, new),
        }
    }
    hunk.flush(previous, &old_spans, current, &new_spans, &mut records);

    records
}

/// Byte ranges of every word in `text`
pub(crate) fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;

    for (idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push(s..idx);
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Token index range (first, last) of one side of a hunk
type TokenRun = Option<(usize, usize)>;

fn extend(run: TokenRun, idx: usize) -> TokenRun {
    match run {
        Some((first, _)) => Some((first, idx)),
        None => Some((idx, idx)),
    }
}

#[derive(Default)]
struct Hunk {
    deleted: TokenRun,
    inserted: TokenRun,
}

impl Hunk {
    fn flush(
        &mut self,
        previous: &str,
        old_spans: &[Range<usize>],
        current: &str,
        new_spans: &[Range<usize>],
        records: &mut Vec<ChangeRecord>,
    ) {
        if let Some((first, last)) = self.deleted.take() {
            records.push(ChangeRecord::deletion(
                &previous[old_spans[first].start..old_spans[last].end],
            ));
        }
        if let Some((first, last)) = self.inserted.take() {
            records.push(ChangeRecord::addition(
                &current[new_spans[first].start..new_spans[last].end],
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::ChangeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_text_has_no_changes() {
        let text = "Welcome to the store. Prices updated daily.";
        assert!(diff_words(text, text).is_empty());
    }

    #[test]
    fn test_both_empty() {
        assert!(diff_words("", "").is_empty());
    }

    #[test]
    fn test_empty_previous_is_single_addition() {
        let records = diff_words("", "Hello brave new world");
        assert_eq!(records, vec![ChangeRecord::addition("Hello brave new world")]);
    }

    #[test]
    fn test_empty_current_is_single_deletion() {
        let records = diff_words("gone for good", "");
        assert_eq!(records, vec![ChangeRecord::deletion("gone for good")]);
    }

    #[test]
    fn test_price_change() {
        let records = diff_words("Price: $10", "Price: $12");
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("$10"), ChangeRecord::addition("$12")]
        );
    }

    #[test]
    fn test_whitespace_only_change_is_ignored() {
        assert!(diff_words("a  b\tc", "a b c").is_empty());
    }

    #[test]
    fn test_changed_run_keeps_interior_whitespace() {
        let records = diff_words("one two three four", "one 2  3 four");
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("two three"), ChangeRecord::addition("2  3")]
        );
    }

    #[test]
    fn test_records_follow_document_order() {
        let records = diff_words("alpha beta gamma delta", "alpha gamma delta epsilon");
        let kinds: Vec<ChangeKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Deletion, ChangeKind::Addition]);
        assert_eq!(records[0].value, "beta");
        assert_eq!(records[1].value, "epsilon");
    }

    #[test]
    fn test_unicode_words() {
        let records = diff_words("Größe: klein", "Größe: groß");
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("klein"), ChangeRecord::addition("groß")]
        );
    }

    #[test]
    fn test_word_spans() {
        let text = "  a bc\n d ";
        let words: Vec<&str> = word_spans(text).into_iter().map(|r| &text[r]).collect();
        assert_eq!(words, vec!["a", "bc", "d"]);
    }

    #[test]
    fn test_full_rewrite_of_large_text() {
        let before: Vec<String> = (0..20_000).map(|i| format!("old{}", i)).collect();
        let after: Vec<String> = (0..20_000).map(|i| format!("new{}", i)).collect();
        let before = before.join(" ");
        let after = after.join(" ");

        let records = diff_words(&before, &after);
        assert_eq!(
            records,
            vec![ChangeRecord::deletion(before.as_str()), ChangeRecord::addition(after.as_str())]
        );
    }
}
