//! OpenAI chat-completions summarizer.

use async_trait::async_trait;
use reqwest::Client;

use super::{Provider, ProviderConfig, SummaryResult, Summarizer, chat};

/// Sampling temperature for summaries
const TEMPERATURE: f32 = 0.3;

pub struct OpenAiSummarizer {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiSummarizer {
    pub fn new(config: ProviderConfig) -> SummaryResult<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, prompt: &str) -> SummaryResult<String> {
        chat::complete(
            &self.client,
            Provider::OpenAi,
            &self.config,
            prompt,
            Some(TEMPERATURE),
        )
        .await
    }
}
