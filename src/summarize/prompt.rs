//! Summary prompt construction.

use crate::diff::ChangeRecord;

/// Maximum number of change records embedded in a prompt
pub const MAX_PROMPT_CHANGES: usize = 50;

/// Maximum characters of a single record value embedded in a prompt
pub const MAX_PROMPT_VALUE_CHARS: usize = 800;

/// Build the prompt asking for a plain-language explanation of a change.
///
/// At most [`MAX_PROMPT_CHANGES`] records are embedded as pretty JSON,
/// each value cut to [`MAX_PROMPT_VALUE_CHARS`] characters.
/// When the change is visual only, the prompt says so and states the
/// number of differing pixels.
pub fn build_summary_prompt(changes: &[ChangeRecord], visual_pixels: Option<u64>) -> String {
    let mut prompt = String::from("A webpage has changed.\n\n");

    if changes.is_empty() {
        prompt.push_str("No text changes were detected.\n");
    } else {
        let shown: Vec<ChangeRecord> = changes
            .iter()
            .take(MAX_PROMPT_CHANGES)
            .map(|record| ChangeRecord {
                kind: record.kind,
                value: truncate_chars(&record.value, MAX_PROMPT_VALUE_CHARS).to_string(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&shown).unwrap_or_else(|_| "[]".to_string());
        prompt.push_str("Changes (Text Diff):\n");
        prompt.push_str(&json);
        prompt.push('\n');
        if changes.len() > shown.len() {
            prompt.push_str(&format!(
                "(showing the first {} of {} changes)\n",
                shown.len(),
                changes.len()
            ));
        }
    }

    if let Some(pixels) = visual_pixels.filter(|&p| p > 0) {
        prompt.push_str(&format!(
            "\nVisual comparison: {} pixels differ from the previous capture.\n",
            pixels
        ));
    }

    prompt.push_str(
        "\nExplain in simple language:\n\
         1) What changed significantly?\n\
         2) Why might it matter to a user?\n\n\
         Keep it concise and friendly.\n",
    );
    prompt
}

/// Longest prefix of `text` with at most `max` characters
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
