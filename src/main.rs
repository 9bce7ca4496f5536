use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing::{Level, info, warn};

use page_watch::capture::{BrowserCapturer, BrowserConfig, VisualCapturer};
use page_watch::config::{MonitorConfig, SummaryInput, parse_viewport};
use page_watch::diff::{DiffMode, VisualDiffOptions, compare_png, diff_markup, diff_words, extract_text};
use page_watch::fetch::HttpContentFetcher;
use page_watch::logging::init_tracing;
use page_watch::monitor::ChangeMonitor;
use page_watch::report::{append_to_feed, render_report};
use page_watch::snapshot::FsSnapshotStore;
use page_watch::summarize::{self, Provider, SummaryError};

/// Page Watch - detect text, structural and visual changes on a web page
#[derive(Parser, Debug)]
#[command(
    name = "page-watch",
    version,
    about = "Detect text, structural and visual changes on a web page",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_WATCH_URL                 Resource to monitor\n\
        PAGE_WATCH_STORE_DIR           Snapshot directory\n\
        PAGE_WATCH_DIFF_MODE           text or markup\n\
        PAGE_WATCH_USE_AI              Enable summaries\n\
        PAGE_WATCH_AI_PROVIDER         openai, google or openrouter\n\
        PAGE_WATCH_<PROVIDER>_API_KEY  Credential for the selected provider\n\
        RUST_LOG                       Log filter (overrides --verbose)"
)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one monitoring pass and print the verdict as JSON
    Check {
        /// Resource to monitor (falls back to PAGE_WATCH_URL)
        #[arg(short, long)]
        url: Option<String>,

        /// Snapshot key (default: the URL)
        #[arg(short, long)]
        key: Option<String>,

        /// Diff mode: text or markup
        #[arg(short, long)]
        mode: Option<String>,

        /// Skip screenshot capture and visual diffing
        #[arg(long)]
        no_visual: bool,

        /// Capture viewport: WxH, desktop, hd or mobile
        #[arg(long)]
        viewport: Option<String>,

        /// Snapshot directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Headless browser binary
        #[arg(long)]
        browser: Option<PathBuf>,

        /// Summarize changes with an AI provider
        #[arg(long)]
        use_ai: bool,

        /// AI provider: openai, google or openrouter
        #[arg(long)]
        provider: Option<String>,

        /// JSON file with summary settings (useAI, aiProvider, *ApiKey, modelPreset, ...)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write an HTML report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Append the verdict to this JSON-lines feed
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Write the visual difference image (if any) to this path
        #[arg(long)]
        diff_image: Option<PathBuf>,
    },

    /// Compare two PNG files pixel by pixel
    Compare {
        /// Previous image
        before: PathBuf,

        /// Current image
        after: PathBuf,

        /// Write the difference image to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Matching threshold (0 = exact, 1 = anything matches)
        #[arg(short, long, default_value = "0.1")]
        threshold: f64,
    },

    /// Diff two local files as text or markup
    Diff {
        /// Previous version
        previous: PathBuf,

        /// Current version
        current: PathBuf,

        /// Diff mode: text or markup
        #[arg(short, long, default_value = "text")]
        mode: String,

        /// Extract page text from HTML before a text diff
        #[arg(long)]
        extract: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    init_tracing(args.log_json, level);

    match args.command {
        Commands::Check {
            url,
            key,
            mode,
            no_visual,
            viewport,
            store_dir,
            browser,
            use_ai,
            provider,
            input,
            report,
            feed,
            diff_image,
        } => {
            let mut config = MonitorConfig::from_env()?;
            if let Some(url) = url {
                config.url = url;
            }
            if let Some(key) = key {
                config.key = Some(key);
            }
            if let Some(mode) = mode {
                config.diff_mode = parse_mode(&mode)?;
            }
            if no_visual {
                config.visual = false;
            }
            if let Some(viewport) = viewport {
                let (w, h) = parse_viewport(&viewport)
                    .with_context(|| format!("Invalid viewport '{}'", viewport))?;
                config = config.viewport(w, h);
            }
            if let Some(dir) = store_dir {
                config.store_dir = dir;
            }
            if let Some(browser) = browser {
                config.browser = browser;
            }

            let mut summary_input = match input {
                Some(path) => {
                    let raw = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_slice::<SummaryInput>(&raw)
                        .with_context(|| format!("Invalid summary input in {}", path.display()))?
                }
                None => SummaryInput::from_env()?,
            };
            if use_ai {
                summary_input.use_ai = true;
            }
            if let Some(provider) = provider {
                summary_input.provider = provider.parse::<Provider>().map_err(anyhow::Error::msg)?;
            }
            config.summary = summary_input.resolve();
            config.validate()?;

            if config.summary.enabled {
                info!(
                    provider = %config.summary.provider,
                    key_source = config.summary.key_source.unwrap_or("none"),
                    credential = if config.summary.has_credential() { "set" } else { "missing" },
                    model = config.summary.effective_model(),
                    "Summary settings resolved"
                );
            }

            let mut monitor = ChangeMonitor::new(
                Arc::new(FsSnapshotStore::new(&config.store_dir)),
                Arc::new(HttpContentFetcher::with_timeout(config.fetch_timeout)?),
            );
            if config.visual {
                let browser = BrowserConfig::new(&config.browser)
                    .viewport(config.viewport_width, config.viewport_height)
                    .timeout(config.capture_timeout);
                let capturer: Arc<dyn VisualCapturer> = Arc::new(BrowserCapturer::new(browser));
                monitor = monitor.capturer(capturer);
            }
            if config.summary.enabled {
                match summarize::from_settings(&config.summary) {
                    Ok(summarizer) => monitor = monitor.summarizer(Arc::from(summarizer)),
                    Err(SummaryError::MissingCredential { provider }) => {
                        warn!(%provider, "No API key configured, summaries will be skipped");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let outcome = monitor.run(&config.monitor_options()).await?;

            println!("{}", serde_json::to_string_pretty(&outcome.verdict)?);

            if let Some(path) = report {
                let html = render_report(&outcome.verdict, outcome.diff_image.as_deref());
                tokio::fs::write(&path, html)
                    .await
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                info!(path = %path.display(), "Report written");
            }
            if let Some(path) = feed {
                append_to_feed(&path, &outcome.verdict)
                    .await
                    .with_context(|| format!("Failed to append to feed {}", path.display()))?;
            }
            if let (Some(path), Some(png)) = (diff_image, &outcome.diff_image) {
                tokio::fs::write(&path, png)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        Commands::Compare {
            before,
            after,
            output,
            threshold,
        } => {
            let before_png = tokio::fs::read(&before)
                .await
                .with_context(|| format!("Failed to read {}", before.display()))?;
            let after_png = tokio::fs::read(&after)
                .await
                .with_context(|| format!("Failed to read {}", after.display()))?;

            let options = VisualDiffOptions::default().threshold(threshold);
            let result = compare_png(&before_png, &after_png, &options)?;

            if let (Some(path), Some(image)) = (&output, &result.difference_image) {
                tokio::fs::write(path, image.to_png()?)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            let summary = json!({
                "pixelCount": result.pixel_count,
                "width": result.compared_width,
                "height": result.compared_height,
                "cropped": result.cropped,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Diff {
            previous,
            current,
            mode,
            extract,
        } => {
            let old = tokio::fs::read_to_string(&previous)
                .await
                .with_context(|| format!("Failed to read {}", previous.display()))?;
            let new = tokio::fs::read_to_string(&current)
                .await
                .with_context(|| format!("Failed to read {}", current.display()))?;

            let records = match parse_mode(&mode)? {
                DiffMode::Markup => diff_markup(&old, &new),
                DiffMode::Text if extract => diff_words(&extract_text(&old), &extract_text(&new)),
                DiffMode::Text => diff_words(&old, &new),
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}

fn parse_mode(mode: &str) -> Result<DiffMode> {
    match DiffMode::from_str(mode) {
        Some(mode) => Ok(mode),
        None => bail!("Invalid diff mode '{}'. Use: text or markup", mode),
    }
}
