//! Configuration management with environment variable support.
//!
//! Configuration is resolved once at the entry boundary into explicit
//! structures and validated before a monitoring run starts:
//! - [`SummaryInput`] holds raw, possibly overlapping summarizer fields and
//!   [`SummaryInput::resolve`] applies the model/credential precedence
//! - [`MonitorConfig`] holds everything one run needs
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_WATCH_URL` | Resource to monitor | (required) |
//! | `PAGE_WATCH_KEY` | Snapshot key | the URL |
//! | `PAGE_WATCH_DIFF_MODE` | `text` or `markup` | `text` |
//! | `PAGE_WATCH_VISUAL` | Enable visual diffing | `true` |
//! | `PAGE_WATCH_VIEWPORT` | Capture width and initial height, `WxH` or preset | `1280x720` |
//! | `PAGE_WATCH_STORE_DIR` | Snapshot directory | `./page-snapshots` |
//! | `PAGE_WATCH_BROWSER` | Headless browser binary | `chromium` |
//! | `PAGE_WATCH_FETCH_TIMEOUT` | Fetch timeout in seconds | `20` |
//! | `PAGE_WATCH_CAPTURE_TIMEOUT` | Capture timeout in seconds | `60` |
//! | `PAGE_WATCH_USE_AI` | Enable summaries | `false` |
//! | `PAGE_WATCH_AI_PROVIDER` | `openai`, `google` or `openrouter` | `openai` |
//! | `PAGE_WATCH_OPENAI_API_KEY` | OpenAI credential | |
//! | `PAGE_WATCH_GOOGLE_API_KEY` | Google credential | |
//! | `PAGE_WATCH_OPENROUTER_API_KEY` | OpenRouter credential | |
//! | `PAGE_WATCH_MODEL_PRESET` | Named model, or `CUSTOM` | `gemini-2.0-flash-lite-preview-02-05` |
//! | `PAGE_WATCH_CUSTOM_MODEL` | Model used with the `CUSTOM` preset | |
//! | `PAGE_WATCH_MODEL` | Legacy model override | |
//! | `PAGE_WATCH_OPENROUTER_MODEL` | Legacy OpenRouter model override | |
//! | `PAGE_WATCH_AI_API_BASE` | Provider base URL override | provider default |
//! | `PAGE_WATCH_SUMMARY_TIMEOUT` | Summary request timeout in seconds | `60` |
//!
//! # Example
//!
//! ```bash
//! export PAGE_WATCH_URL="https://example.com/pricing"
//! export PAGE_WATCH_USE_AI=true
//! export PAGE_WATCH_AI_PROVIDER=google
//! export PAGE_WATCH_GOOGLE_API_KEY="..."
//! page-watch check
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::diff::DiffMode;
use crate::monitor::MonitorOptions;
use crate::summarize::Provider;

// ============================================================================
// Default Values
// ============================================================================

/// Default page fetch timeout (seconds)
pub const DEFAULT_FETCH_TIMEOUT: u64 = 20;

/// Default browser capture timeout (seconds)
pub const DEFAULT_CAPTURE_TIMEOUT: u64 = 60;

/// Default summary request timeout (seconds)
pub const DEFAULT_SUMMARY_TIMEOUT: u64 = 60;

/// Default capture width (pixels)
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default initial viewport height (pixels); captures span the full page
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

/// Default headless browser binary
pub const DEFAULT_BROWSER_BINARY: &str = "chromium";

/// Default snapshot directory
pub const DEFAULT_STORE_DIR: &str = "./page-snapshots";

/// Default model preset
pub const DEFAULT_MODEL_PRESET: &str = "gemini-2.0-flash-lite-preview-02-05";

/// Preset value selecting the custom model field
pub const CUSTOM_MODEL_PRESET: &str = "CUSTOM";

/// Default OpenAI model
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Default Google model
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.0-flash-lite-preview-02-05";

/// Default OpenRouter model
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o";

/// OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Google Generative Language API base URL
pub const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// OpenRouter API base URL
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// User agent sent with page fetches
pub const USER_AGENT: &str = concat!("page-watch/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_URL: &str = "PAGE_WATCH_URL";
pub const ENV_KEY: &str = "PAGE_WATCH_KEY";
pub const ENV_DIFF_MODE: &str = "PAGE_WATCH_DIFF_MODE";
pub const ENV_VISUAL: &str = "PAGE_WATCH_VISUAL";
pub const ENV_VIEWPORT: &str = "PAGE_WATCH_VIEWPORT";
pub const ENV_STORE_DIR: &str = "PAGE_WATCH_STORE_DIR";
pub const ENV_BROWSER: &str = "PAGE_WATCH_BROWSER";
pub const ENV_FETCH_TIMEOUT: &str = "PAGE_WATCH_FETCH_TIMEOUT";
pub const ENV_CAPTURE_TIMEOUT: &str = "PAGE_WATCH_CAPTURE_TIMEOUT";
pub const ENV_USE_AI: &str = "PAGE_WATCH_USE_AI";
pub const ENV_AI_PROVIDER: &str = "PAGE_WATCH_AI_PROVIDER";
pub const ENV_OPENAI_API_KEY: &str = "PAGE_WATCH_OPENAI_API_KEY";
pub const ENV_GOOGLE_API_KEY: &str = "PAGE_WATCH_GOOGLE_API_KEY";
pub const ENV_OPENROUTER_API_KEY: &str = "PAGE_WATCH_OPENROUTER_API_KEY";
pub const ENV_MODEL_PRESET: &str = "PAGE_WATCH_MODEL_PRESET";
pub const ENV_CUSTOM_MODEL: &str = "PAGE_WATCH_CUSTOM_MODEL";
pub const ENV_MODEL: &str = "PAGE_WATCH_MODEL";
pub const ENV_OPENROUTER_MODEL: &str = "PAGE_WATCH_OPENROUTER_MODEL";
pub const ENV_AI_API_BASE: &str = "PAGE_WATCH_AI_API_BASE";
pub const ENV_SUMMARY_TIMEOUT: &str = "PAGE_WATCH_SUMMARY_TIMEOUT";

// ============================================================================
// Errors
// ============================================================================

/// Problems found while resolving or validating configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a resource URL is required")]
    MissingUrl,

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{scheme}' in '{url}', expected http or https")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("snapshot key must not be empty")]
    EmptyKey,

    #[error("viewport must be non-zero, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

// ============================================================================
// Summary settings
// ============================================================================

/// Raw summarizer input as supplied by a caller.
///
/// Fields may overlap (several model fields, one key per provider);
/// [`SummaryInput::resolve`] reduces them to one [`SummarySettings`].
/// Deserializes from the camelCase field names of a JSON input document.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryInput {
    /// Whether summaries are requested at all
    #[serde(rename = "useAI")]
    pub use_ai: bool,
    /// Selected provider
    #[serde(rename = "aiProvider")]
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub open_router_api_key: Option<String>,
    /// Named model, or [`CUSTOM_MODEL_PRESET`]
    pub model_preset: Option<String>,
    /// Model used when the preset is [`CUSTOM_MODEL_PRESET`]
    pub custom_model: Option<String>,
    /// Legacy model override
    pub model: Option<String>,
    /// Legacy OpenRouter model override
    pub open_router_model: Option<String>,
    /// Provider base URL override
    pub api_base: Option<String>,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for SummaryInput {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for SummaryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryInput")
            .field("use_ai", &self.use_ai)
            .field("provider", &self.provider)
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("google_api_key", &mask(&self.google_api_key))
            .field("open_router_api_key", &mask(&self.open_router_api_key))
            .field("model_preset", &self.model_preset)
            .field("custom_model", &self.custom_model)
            .field("model", &self.model)
            .field("open_router_model", &self.open_router_model)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SummaryInput {
    /// Create summary input from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match non_empty_env(ENV_AI_PROVIDER) {
            Some(value) => value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: ENV_AI_PROVIDER.to_string(),
                value,
                reason,
            })?,
            None => Provider::default(),
        };

        Ok(Self {
            use_ai: env_bool(ENV_USE_AI)?.unwrap_or(false),
            provider,
            openai_api_key: non_empty_env(ENV_OPENAI_API_KEY),
            google_api_key: non_empty_env(ENV_GOOGLE_API_KEY),
            open_router_api_key: non_empty_env(ENV_OPENROUTER_API_KEY),
            model_preset: non_empty_env(ENV_MODEL_PRESET)
                .or_else(|| Some(DEFAULT_MODEL_PRESET.to_string())),
            custom_model: non_empty_env(ENV_CUSTOM_MODEL),
            model: non_empty_env(ENV_MODEL),
            open_router_model: non_empty_env(ENV_OPENROUTER_MODEL),
            api_base: non_empty_env(ENV_AI_API_BASE),
            timeout_secs: env_parse(ENV_SUMMARY_TIMEOUT)?.unwrap_or(DEFAULT_SUMMARY_TIMEOUT),
        })
    }

    /// Create summary input with defaults (summaries disabled)
    pub fn defaults() -> Self {
        Self {
            use_ai: false,
            provider: Provider::default(),
            openai_api_key: None,
            google_api_key: None,
            open_router_api_key: None,
            model_preset: Some(DEFAULT_MODEL_PRESET.to_string()),
            custom_model: None,
            model: None,
            open_router_model: None,
            api_base: None,
            timeout_secs: DEFAULT_SUMMARY_TIMEOUT,
        }
    }

    /// Credential for the selected provider; other providers' keys are ignored
    fn credential(&self) -> Option<&str> {
        let key = match self.provider {
            Provider::OpenAi => &self.openai_api_key,
            Provider::Google => &self.google_api_key,
            Provider::OpenRouter => &self.open_router_api_key,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Model to request, by precedence:
    /// 1. custom model, when the preset is [`CUSTOM_MODEL_PRESET`]
    /// 2. legacy `model`, then legacy `openRouterModel`
    /// 3. the preset, when the provider accepts it
    ///
    /// `None` means the provider default.
    fn resolve_model(&self) -> Option<String> {
        let preset = present(&self.model_preset);

        if preset == Some(CUSTOM_MODEL_PRESET) {
            if let Some(custom) = present(&self.custom_model) {
                return Some(custom.to_string());
            }
        }

        if let Some(legacy) = present(&self.model).or_else(|| present(&self.open_router_model)) {
            return Some(legacy.to_string());
        }

        match preset {
            Some(preset) if preset != CUSTOM_MODEL_PRESET => {
                if self.provider.accepts_preset(preset) {
                    Some(preset.to_string())
                } else {
                    if self.use_ai {
                        warn!(
                            preset,
                            provider = %self.provider,
                            "Model preset may not be compatible with provider, using provider default"
                        );
                    }
                    None
                }
            }
            _ => None,
        }
    }

    /// Reduce the raw input to the settings a summarizer is built from
    pub fn resolve(&self) -> SummarySettings {
        let api_key = self.credential().map(str::to_string);
        SummarySettings {
            enabled: self.use_ai,
            provider: self.provider,
            key_source: api_key.as_ref().map(|_| self.provider.key_field()),
            api_key,
            model: self.resolve_model(),
            api_base: self.api_base.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Resolved summarizer settings
#[derive(Clone)]
pub struct SummarySettings {
    /// Whether summaries are requested
    pub enabled: bool,
    pub provider: Provider,
    /// Credential for `provider`, if configured
    pub api_key: Option<String>,
    /// Input field the credential came from
    pub key_source: Option<&'static str>,
    /// Explicit model; `None` selects the provider default
    pub model: Option<String>,
    /// Base URL override
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for SummarySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarySettings")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("api_key", &mask(&self.api_key))
            .field("key_source", &self.key_source)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self::disabled()
    }
}

impl SummarySettings {
    /// Settings with summaries turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            provider: Provider::default(),
            api_key: None,
            key_source: None,
            model: None,
            api_base: None,
            timeout: Duration::from_secs(DEFAULT_SUMMARY_TIMEOUT),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.key_source = Some(self.provider.key_field());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Whether a credential is available for the selected provider
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Model that will actually be requested
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

// ============================================================================
// Monitor configuration
// ============================================================================

/// Everything a single monitoring run needs
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Resource to monitor
    pub url: String,
    /// Snapshot key; defaults to the URL
    pub key: Option<String>,
    /// Text or structural diffing
    pub diff_mode: DiffMode,
    /// Whether to capture and compare rasters
    pub visual: bool,
    /// Capture width
    pub viewport_width: u32,
    /// Initial viewport height; captures span the full page
    pub viewport_height: u32,
    /// Snapshot store directory
    pub store_dir: PathBuf,
    /// Headless browser binary
    pub browser: PathBuf,
    pub fetch_timeout: Duration,
    pub capture_timeout: Duration,
    pub summary: SummarySettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let diff_mode = match non_empty_env(ENV_DIFF_MODE) {
            Some(value) => DiffMode::from_str(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: ENV_DIFF_MODE.to_string(),
                value,
                reason: "expected text or markup".to_string(),
            })?,
            None => DiffMode::default(),
        };

        let (viewport_width, viewport_height) = match non_empty_env(ENV_VIEWPORT) {
            Some(value) => parse_viewport(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: ENV_VIEWPORT.to_string(),
                value,
                reason: "expected WxH, desktop, hd or mobile".to_string(),
            })?,
            None => (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
        };

        Ok(Self {
            url: non_empty_env(ENV_URL).unwrap_or_default(),
            key: non_empty_env(ENV_KEY),
            diff_mode,
            visual: env_bool(ENV_VISUAL)?.unwrap_or(true),
            viewport_width,
            viewport_height,
            store_dir: non_empty_env(ENV_STORE_DIR)
                .unwrap_or_else(|| DEFAULT_STORE_DIR.to_string())
                .into(),
            browser: non_empty_env(ENV_BROWSER)
                .unwrap_or_else(|| DEFAULT_BROWSER_BINARY.to_string())
                .into(),
            fetch_timeout: Duration::from_secs(
                env_parse(ENV_FETCH_TIMEOUT)?.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            ),
            capture_timeout: Duration::from_secs(
                env_parse(ENV_CAPTURE_TIMEOUT)?.unwrap_or(DEFAULT_CAPTURE_TIMEOUT),
            ),
            summary: SummaryInput::from_env()?.resolve(),
        })
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            url: String::new(),
            key: None,
            diff_mode: DiffMode::default(),
            visual: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            browser: PathBuf::from(DEFAULT_BROWSER_BINARY),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT),
            capture_timeout: Duration::from_secs(DEFAULT_CAPTURE_TIMEOUT),
            summary: SummarySettings::disabled(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn diff_mode(mut self, mode: DiffMode) -> Self {
        self.diff_mode = mode;
        self
    }

    pub fn visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn summary(mut self, summary: SummarySettings) -> Self {
        self.summary = summary;
        self
    }

    /// Snapshot key actually used: the explicit key, or the URL
    pub fn resolved_key(&self) -> &str {
        self.key.as_deref().unwrap_or(self.url.trim())
    }

    /// Check the configuration before any I/O happens
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }

        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        if self.key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyKey);
        }

        if self.visual && (self.viewport_width == 0 || self.viewport_height == 0) {
            return Err(ConfigError::InvalidViewport {
                width: self.viewport_width,
                height: self.viewport_height,
            });
        }

        Ok(())
    }

    /// Orchestrator options for this configuration
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions::new(self.url.trim(), self.resolved_key())
            .diff_mode(self.diff_mode)
            .visual(self.visual)
            .summarize(self.summary.enabled)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a viewport string into (width, height)
/// Supports: "desktop" (1280x720), "hd" (1920x1080), "mobile" (390x844), or "WxH"
pub fn parse_viewport(size: &str) -> Option<(u32, u32)> {
    match size.trim().to_lowercase().as_str() {
        "desktop" => Some((1280, 720)),
        "hd" => Some((1920, 1080)),
        "mobile" => Some((390, 844)),
        custom => {
            let (w, h) = custom.split_once('x')?;
            Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = non_empty_env(name) else {
        return Ok(None);
    };
    parse_bool(&value)
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
            reason: "expected true/false".to_string(),
        })
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    let Some(value) = non_empty_env(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
            value,
        })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn mask(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "***" } else { "<unset>" }
}
