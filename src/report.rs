//! Presentation of run verdicts.
//!
//! - [`render_report`] builds a standalone HTML page for one verdict
//! - [`append_to_feed`] appends the verdict to a JSON-lines results feed

use std::fmt::Write as _;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::AsyncWriteExt;

use crate::diff::ChangeKind;
use crate::monitor::{RunStatus, RunVerdict, VisualMetric};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem;color:#222}\
h1{font-size:1.4rem}.meta{color:#666}.badge{display:inline-block;padding:.2rem .6rem;border-radius:4px;color:#fff}\
.changed{background:#c0392b}.unchanged{background:#27ae60}.initial{background:#2980b9}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ddd;padding:.4rem;vertical-align:top;text-align:left}\
td.addition{background:#eafaf1}td.deletion{background:#fdedec}pre{white-space:pre-wrap;word-break:break-word;margin:0}\
img{max-width:100%;border:1px solid #ddd}";

/// Render an HTML report for a verdict.
///
/// Sections are chosen by status: first run, unchanged, or changed with
/// the summary, change list and difference image (embedded as a data URL).
/// All verdict content is HTML-escaped.
pub fn render_report(verdict: &RunVerdict, diff_image: Option<&[u8]>) -> String {
    let mut html = String::with_capacity(4096);
    let url = escape_html(&verdict.url);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Page Watch: {url}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>Page Watch report</h1>\n\
         <p class=\"meta\"><a href=\"{url}\">{url}</a><br>Checked at {}</p>\n",
        verdict.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    match verdict.status {
        RunStatus::InitialRun => {
            html.push_str(
                "<p><span class=\"badge initial\">First run</span></p>\n\
                 <p>No previous snapshot existed. The current state was saved as the baseline.</p>\n",
            );
        }
        RunStatus::NoChange => {
            html.push_str(
                "<p><span class=\"badge unchanged\">No change</span></p>\n\
                 <p>The page matches the previous snapshot.</p>\n",
            );
            render_visual_metric(&mut html, verdict.visual_difference_metric);
        }
        RunStatus::Changed => {
            html.push_str("<p><span class=\"badge changed\">Changed</span></p>\n");
            render_summary(&mut html, verdict.summary.as_deref());
            render_changes(&mut html, verdict);
            render_visual_metric(&mut html, verdict.visual_difference_metric);
            if let Some(png) = diff_image {
                let _ = write!(
                    html,
                    "<h2>Visual difference</h2>\n<img alt=\"Visual difference\" src=\"data:image/png;base64,{}\">\n",
                    STANDARD.encode(png)
                );
            }
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_summary(html: &mut String, summary: Option<&str>) {
    html.push_str("<h2>Summary</h2>\n");
    match summary {
        Some(text) => {
            let paragraphs = escape_html(text).replace('\n', "<br>");
            let _ = writeln!(html, "<p>{}</p>", paragraphs);
        }
        None => html.push_str("<p>No summary available.</p>\n"),
    }
}

fn render_changes(html: &mut String, verdict: &RunVerdict) {
    html.push_str("<h2>Changes</h2>\n");
    if verdict.changes.is_empty() {
        html.push_str("<p>Visual change only, no text changes detected.</p>\n");
        return;
    }
    html.push_str("<table>\n<tr><th>Kind</th><th>Content</th></tr>\n");
    for record in &verdict.changes {
        let class = match record.kind {
            ChangeKind::Addition => "addition",
            ChangeKind::Deletion => "deletion",
        };
        let _ = writeln!(
            html,
            "<tr><td class=\"{class}\">{}</td><td class=\"{class}\"><pre>{}</pre></td></tr>",
            record.kind,
            escape_html(&record.value)
        );
    }
    html.push_str("</table>\n");
}

fn render_visual_metric(html: &mut String, metric: VisualMetric) {
    match metric {
        VisualMetric::Compared(pixels) => {
            let _ = writeln!(html, "<p>Differing pixels: {}</p>", pixels);
        }
        VisualMetric::NotComparable => {
            html.push_str("<p>No visual comparison was made.</p>\n");
        }
    }
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Append the verdict as one JSON line to `path`, creating the file if needed
pub async fn append_to_feed(path: &Path, verdict: &RunVerdict) -> std::io::Result<()> {
    let mut line = serde_json::to_string(verdict).map_err(std::io::Error::other)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeRecord;
    use chrono::Utc;

    fn verdict() -> RunVerdict {
        RunVerdict::initial("https://example.com/?a=1&b=2", "k", Utc::now())
    }

    #[test]
    fn test_initial_run_section_only() {
        let html = render_report(&verdict(), None);
        assert!(html.contains("First run"));
        assert!(!html.contains("<h2>Changes</h2>"));
        assert!(html.contains("https://example.com/?a=1&amp;b=2"));
    }

    #[test]
    fn test_unchanged_section() {
        let mut v = verdict();
        v.apply_changes(Vec::new());
        v.apply_visual(0);
        let html = render_report(&v, None);
        assert!(html.contains("No change"));
        assert!(html.contains("Differing pixels: 0"));
        assert!(!html.contains("First run"));
    }

    #[test]
    fn test_changed_section_escapes_content() {
        let mut v = verdict();
        v.apply_changes(vec![ChangeRecord::addition("<script>alert(1)</script>")]);
        v.summary = Some("Price went up.\nCheck it.".to_string());
        let html = render_report(&v, Some(&[1, 2, 3]));

        assert!(html.contains("Changed"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("Price went up.<br>Check it."));
        assert!(html.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_visual_only_change() {
        let mut v = verdict();
        v.apply_changes(Vec::new());
        v.apply_visual(12);
        let html = render_report(&v, None);
        assert!(html.contains("Visual change only"));
        assert!(html.contains("No summary available."));
    }

    #[tokio::test]
    async fn test_append_to_feed_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        append_to_feed(&path, &verdict()).await.unwrap();
        append_to_feed(&path, &verdict()).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunVerdict = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.status, RunStatus::InitialRun);
    }
}
