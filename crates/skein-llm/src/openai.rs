use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use skein_core::errors::GenerateError;
use skein_core::generate::{format_transcript, TextGenerator};
use skein_core::message::Message;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.3;

/// Chat-completions generator. The prompt goes in as the system
/// message, the rendered transcript as the user message.
pub struct OpenAiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(api_key: SecretString, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            model: model.into(),
            max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    #[instrument(skip(self, messages, prompt), fields(message_count = messages.len()))]
    async fn generate(
        &self,
        messages: &[Message],
        prompt: &str,
    ) -> Result<String, GenerateError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt},
                {"role": "user", "content": format_transcript(messages)},
            ],
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::from_status(status.as_u16(), body));
        }

        let completion: CompletionEnvelope = response
            .json()
            .await
            .map_err(|e| GenerateError::Decode(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerateError::Decode("completion had no choices".into()))?;

        Ok(text.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}
