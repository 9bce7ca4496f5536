//! Natural-language summaries of detected changes.
//!
//! A [`Summarizer`] turns a text prompt into a short explanation. One
//! implementation exists per provider:
//! - [`OpenAiSummarizer`] - OpenAI chat completions
//! - [`GoogleSummarizer`] - Gemini `generateContent`
//! - [`OpenRouterSummarizer`] - OpenRouter chat completions
//!
//! [`from_settings`] picks the implementation for resolved settings.

mod chat;
pub mod google;
pub mod openai;
pub mod openrouter;
pub mod prompt;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    DEFAULT_GOOGLE_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENROUTER_MODEL, GOOGLE_API_BASE,
    OPENAI_API_BASE, OPENROUTER_API_BASE, SummarySettings,
};

pub use google::GoogleSummarizer;
pub use openai::OpenAiSummarizer;
pub use openrouter::OpenRouterSummarizer;
pub use prompt::{MAX_PROMPT_CHANGES, MAX_PROMPT_VALUE_CHARS, build_summary_prompt};

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// Result type for summarizer operations
pub type SummaryResult<T> = Result<T, SummaryError>;

/// Supported summary providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Google,
    OpenRouter,
}

impl Provider {
    /// Model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => DEFAULT_OPENAI_MODEL,
            Provider::Google => DEFAULT_GOOGLE_MODEL,
            Provider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        }
    }

    /// Public API base URL
    pub fn default_api_base(self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_API_BASE,
            Provider::Google => GOOGLE_API_BASE,
            Provider::OpenRouter => OPENROUTER_API_BASE,
        }
    }

    /// Name of the input field holding this provider's credential
    pub fn key_field(self) -> &'static str {
        match self {
            Provider::OpenAi => "openaiApiKey",
            Provider::Google => "googleApiKey",
            Provider::OpenRouter => "openRouterApiKey",
        }
    }

    /// Whether a named model preset can be served by this provider
    pub fn accepts_preset(self, preset: &str) -> bool {
        match self {
            Provider::OpenAi => preset.starts_with("gpt"),
            Provider::Google => preset.starts_with("gemini"),
            Provider::OpenRouter => true,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Google => write!(f, "google"),
            Provider::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "google" | "gemini" => Ok(Provider::Google),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!(
                "unknown provider '{}', expected openai, google or openrouter",
                other
            )),
        }
    }
}

/// Errors raised by summarizers
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No credential is configured for the provider
    #[error("no API key configured for {provider}")]
    MissingCredential { provider: Provider },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure talking to the provider
    #[error("{provider} request failed: {source}")]
    Http {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with an error status
    #[error("{provider} returned HTTP {status}: {body}")]
    Upstream {
        provider: Provider,
        status: u16,
        body: String,
    },

    /// The provider's answer did not contain a summary
    #[error("{provider} response malformed: {reason}")]
    MalformedResponse { provider: Provider, reason: String },
}

/// Connection settings shared by all providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Settings for `provider` with its default model and base URL
    pub fn new(provider: Provider, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            api_base: provider.default_api_base().to_string(),
            timeout,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn client(&self) -> SummaryResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(SummaryError::Client)
    }
}

/// Produces a natural-language summary for a prompt
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short identifier of the backing provider
    fn provider_name(&self) -> &str;

    /// Model the summarizer calls
    fn model(&self) -> &str;

    async fn summarize(&self, prompt: &str) -> SummaryResult<String>;
}

/// Build the summarizer for resolved settings.
///
/// Fails with [`SummaryError::MissingCredential`] when the selected
/// provider has no key.
pub fn from_settings(settings: &SummarySettings) -> SummaryResult<Box<dyn Summarizer>> {
    let api_key = settings
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or(SummaryError::MissingCredential {
            provider: settings.provider,
        })?;

    let mut config = ProviderConfig::new(settings.provider, api_key, settings.timeout);
    if let Some(model) = &settings.model {
        config = config.model(model.clone());
    }
    if let Some(base) = &settings.api_base {
        config = config.api_base(base.clone());
    }

    Ok(match settings.provider {
        Provider::OpenAi => Box::new(OpenAiSummarizer::new(config)?),
        Provider::Google => Box::new(GoogleSummarizer::new(config)?),
        Provider::OpenRouter => Box::new(OpenRouterSummarizer::new(config)?),
    })
}

/// Keep error bodies short enough to embed in a summary field
fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Turn a non-success response into [`SummaryError::Upstream`]
async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> SummaryResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response unavailable>".to_string());
    Err(SummaryError::Upstream {
        provider,
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<Provider>(), Ok(Provider::OpenAi));
        assert_eq!("Gemini".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!(" openrouter ".parse::<Provider>(), Ok(Provider::OpenRouter));
        assert!("anthropic".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_roundtrips_through_display() {
        for provider in [Provider::OpenAi, Provider::Google, Provider::OpenRouter] {
            assert_eq!(provider.to_string().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn test_preset_compatibility() {
        assert!(Provider::OpenAi.accepts_preset("gpt-4o-mini"));
        assert!(!Provider::OpenAi.accepts_preset("gemini-1.5-pro"));
        assert!(Provider::Google.accepts_preset("gemini-1.5-pro"));
        assert!(!Provider::Google.accepts_preset("gpt-4o"));
        assert!(Provider::OpenRouter.accepts_preset("anything/at-all"));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  short "), "short");
        let long = "x".repeat(MAX_ERROR_BODY + 10);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ProviderConfig::new(Provider::OpenAi, "k", Duration::from_secs(1))
            .api_base("http://localhost:1234/v1/");
        assert_eq!(config.endpoint("chat/completions"), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_missing_credential() {
        let settings = SummarySettings::disabled().provider(Provider::Google);
        let err = from_settings(&settings).err().unwrap();
        assert!(matches!(
            err,
            SummaryError::MissingCredential {
                provider: Provider::Google
            }
        ));
    }
}
