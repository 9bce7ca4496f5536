//! Google Gemini summarizer.
//!
//! Calls `models/<model>:generateContent` with the key in the
//! `x-goog-api-key` header. Model ids given in `vendor/model` form are
//! reduced to the bare model name.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Provider, ProviderConfig, SummaryError, SummaryResult, Summarizer, check_status};

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GoogleSummarizer {
    client: Client,
    config: ProviderConfig,
}

impl GoogleSummarizer {
    pub fn new(config: ProviderConfig) -> SummaryResult<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    /// Model name as used in the request path
    fn model_path(&self) -> &str {
        bare_model(&self.config.model)
    }
}

fn bare_model(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

#[async_trait]
impl Summarizer for GoogleSummarizer {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, prompt: &str) -> SummaryResult<String> {
        let provider = Provider::Google;
        let url = self
            .config
            .endpoint(&format!("models/{}:generateContent", self.model_path()));
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| SummaryError::Http { provider, source })?;

        let response = check_status(provider, response).await.inspect_err(|err| {
            warn!(%provider, model = %self.config.model, error = %err, "Summary request rejected");
        })?;

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|err| SummaryError::MalformedResponse {
                    provider,
                    reason: err.to_string(),
                })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| SummaryError::MalformedResponse {
                provider,
                reason: "response missing candidate text".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_model() {
        assert_eq!(bare_model("gemini-1.5-pro"), "gemini-1.5-pro");
        assert_eq!(bare_model("google/gemini-1.5-pro"), "gemini-1.5-pro");
    }
}
