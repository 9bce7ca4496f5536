//! OpenRouter summarizer (OpenAI-compatible chat completions).

use async_trait::async_trait;
use reqwest::Client;

use super::{Provider, ProviderConfig, SummaryResult, Summarizer, chat};

pub struct OpenRouterSummarizer {
    client: Client,
    config: ProviderConfig,
}

impl OpenRouterSummarizer {
    pub fn new(config: ProviderConfig) -> SummaryResult<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    fn provider_name(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, prompt: &str) -> SummaryResult<String> {
        chat::complete(&self.client, Provider::OpenRouter, &self.config, prompt, None).await
    }
}
