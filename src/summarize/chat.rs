// Chat-completions wire format shared by OpenAI and OpenRouter

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Provider, ProviderConfig, SummaryError, SummaryResult, check_status};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Send a single-message chat completion and return the reply text
pub(super) async fn complete(
    client: &Client,
    provider: Provider,
    config: &ProviderConfig,
    prompt: &str,
    temperature: Option<f32>,
) -> SummaryResult<String> {
    let body = ChatCompletionRequest {
        model: &config.model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature,
    };

    let response = client
        .post(config.endpoint("chat/completions"))
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|source| SummaryError::Http { provider, source })?;

    let response = check_status(provider, response).await.inspect_err(|err| {
        warn!(%provider, model = %config.model, error = %err, "Summary request rejected");
    })?;

    let parsed: ChatCompletionResponse =
        response
            .json()
            .await
            .map_err(|err| SummaryError::MalformedResponse {
                provider,
                reason: err.to_string(),
            })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| SummaryError::MalformedResponse {
            provider,
            reason: "response missing message content".to_string(),
        })
}
