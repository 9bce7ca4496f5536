//! Change orchestration for a single monitoring run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::types::{MonitorOptions, MonitorResult, RunOutcome, RunVerdict};
use crate::capture::VisualCapturer;
use crate::config::ConfigError;
use crate::diff::{ChangeRecord, DiffMode, compare_png, diff_markup, diff_words};
use crate::fetch::{ContentFetcher, PageContent};
use crate::snapshot::{ResourceSnapshot, SnapshotStore};
use crate::summarize::{SummaryError, Summarizer, build_summary_prompt};

/// Prefix of the summary field when summarizing fails
pub const SUMMARY_ERROR_PREFIX: &str = "Error generating summary";

/// Runs the acquire → diff → summarize → persist cycle for one resource.
///
/// The monitor owns no state between runs; everything persistent lives in
/// the snapshot store.
pub struct ChangeMonitor {
    store: Arc<dyn SnapshotStore>,
    fetcher: Arc<dyn ContentFetcher>,
    capturer: Option<Arc<dyn VisualCapturer>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ChangeMonitor {
    pub fn new(store: Arc<dyn SnapshotStore>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            store,
            fetcher,
            capturer: None,
            summarizer: None,
        }
    }

    /// Capturer used when visual diffing is enabled
    pub fn capturer(mut self, capturer: Arc<dyn VisualCapturer>) -> Self {
        self.capturer = Some(capturer);
        self
    }

    /// Summarizer used when summaries are enabled
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Perform one monitoring run.
    ///
    /// Fails on a missing URL, store, fetch or capture failure. A visual
    /// comparison failure only skips the visual metric, and a summarizer
    /// failure is reported in the verdict's `summary`.
    pub async fn run(&self, options: &MonitorOptions) -> MonitorResult<RunOutcome> {
        let url = options.url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingUrl.into());
        }
        let key = options.key.as_str();
        let checked_at = Utc::now();

        info!(
            url,
            key,
            mode = ?options.diff_mode,
            visual = options.visual,
            "Starting monitoring run"
        );

        let (mut content, image) = tokio::try_join!(self.fetch(url), self.capture(options))?;

        let previous = self.store.get(key).await?;
        let mut verdict = RunVerdict::initial(url, key, checked_at);
        let mut diff_image = None;

        match previous {
            None => info!(key, "No previous snapshot found, saving baseline"),
            Some(previous) => {
                info!(key, saved_at = %previous.saved_at, "Comparing with previous snapshot");

                // Both engines run on blocking workers
                let visual = match (previous.image.clone(), image.clone()) {
                    (Some(before), Some(after)) => {
                        let visual_options = options.visual_options.clone();
                        Some(tokio::task::spawn_blocking(move || {
                            compare_png(&before, &after, &visual_options)
                        }))
                    }
                    _ => None,
                };

                let mode = options.diff_mode;
                let (changes, returned) = tokio::task::spawn_blocking(move || {
                    (diff_content(mode, &previous, &content), content)
                })
                .await?;
                content = returned;
                debug!(count = changes.len(), "Content comparison finished");
                verdict.apply_changes(changes);

                if let Some(task) = visual {
                    match task.await {
                        Ok(Ok(result)) => {
                            info!(
                                pixels = result.pixel_count,
                                width = result.compared_width,
                                height = result.compared_height,
                                "Visual comparison finished"
                            );
                            verdict.apply_visual(result.pixel_count);
                            if result.pixel_count > 0 {
                                diff_image = match result.difference_image.map(|img| img.to_png()) {
                                    Some(Ok(png)) => Some(png),
                                    Some(Err(e)) => {
                                        warn!(error = %e, "Could not encode difference image");
                                        None
                                    }
                                    None => None,
                                };
                            }
                        }
                        Ok(Err(e)) => error!(error = %e, "Visual comparison failed"),
                        Err(e) => error!(error = %e, "Visual comparison task failed"),
                    }
                }

                if let Some(png) = &diff_image {
                    self.store.put_diff_image(key, png).await?;
                }
            }
        }

        if verdict.changed {
            verdict.summary = self.summarize(options, &verdict).await;
        }

        let mut snapshot = ResourceSnapshot::new(content.text).saved_at(checked_at);
        if options.diff_mode.keeps_markup() {
            snapshot = snapshot.with_markup(content.markup);
        }
        if let Some(png) = image {
            snapshot = snapshot.with_image(png);
        }
        self.store.put(key, &snapshot).await?;

        info!(
            key,
            status = %verdict.status,
            changed = verdict.changed,
            changes = verdict.changes.len(),
            "Monitoring run finished"
        );

        Ok(RunOutcome {
            verdict,
            diff_image,
        })
    }

    async fn fetch(&self, url: &str) -> MonitorResult<PageContent> {
        Ok(self.fetcher.fetch(url).await?)
    }

    async fn capture(&self, options: &MonitorOptions) -> MonitorResult<Option<Vec<u8>>> {
        if !options.visual {
            return Ok(None);
        }
        match &self.capturer {
            Some(capturer) => Ok(Some(capturer.capture(options.url.trim()).await?)),
            None => {
                warn!("Visual diffing requested but no capturer is configured");
                Ok(None)
            }
        }
    }

    async fn summarize(&self, options: &MonitorOptions, verdict: &RunVerdict) -> Option<String> {
        if !options.summarize {
            debug!("Summary skipped: summaries are disabled");
            return None;
        }
        let Some(summarizer) = &self.summarizer else {
            warn!("Summary skipped: no credential configured for the selected provider");
            return None;
        };

        let prompt = build_summary_prompt(
            &verdict.changes,
            verdict.visual_difference_metric.pixels(),
        );
        info!(
            provider = summarizer.provider_name(),
            model = summarizer.model(),
            "Generating summary"
        );

        match summarizer.summarize(&prompt).await {
            Ok(summary) => Some(summary),
            Err(SummaryError::MissingCredential { provider }) => {
                warn!(%provider, "Summary skipped: no credential configured");
                None
            }
            Err(e) => {
                warn!(error = %e, "Summary generation failed");
                Some(format!("{}: {}", SUMMARY_ERROR_PREFIX, e))
            }
        }
    }
}

/// Run the text or structural engine against the previous snapshot.
///
/// Structural mode needs the previous markup; without it the text engine
/// is used for this run.
fn diff_content(mode: DiffMode, previous: &ResourceSnapshot, current: &PageContent) -> Vec<ChangeRecord> {
    match (mode, previous.markup.as_deref()) {
        (DiffMode::Markup, Some(markup)) => diff_markup(markup, &current.markup),
        (DiffMode::Markup, None) => {
            info!("Previous snapshot has no markup, falling back to text diff");
            diff_words(&previous.text, &current.text)
        }
        (DiffMode::Text, _) => diff_words(&previous.text, &current.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_mode_falls_back_without_previous_markup() {
        let previous = ResourceSnapshot::new("Price: $10");
        let current = PageContent::from_markup("<p>Price: $12</p>");
        let records = diff_content(DiffMode::Markup, &previous, &current);
        assert_eq!(
            records,
            vec![ChangeRecord::deletion("$10"), ChangeRecord::addition("$12")]
        );
    }

    #[test]
    fn test_markup_mode_uses_structure() {
        let previous = ResourceSnapshot::new("a").with_markup("<ul><li>a</li></ul>");
        let current = PageContent::from_markup("<ul><li>a</li><li>b <b>new</b></li></ul>");
        let records = diff_content(DiffMode::Markup, &previous, &current);
        assert_eq!(records, vec![ChangeRecord::addition("b <b>new</b>")]);
    }
}
