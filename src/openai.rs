use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::assistant::CompletionClient;
use crate::config::CONFIG;

pub const MAX_TOKENS: u32 = 800;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn from_config() -> Self {
        Self {
            api_key: CONFIG.openai_api_key.clone(),
            api_base: CONFIG.openai_api_base.clone(),
            model: CONFIG.openai_model.clone(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Chat completions over the OpenAI HTTP API.
pub struct OpenAiCompletionClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompletionClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let Some(key) = self.config.api_key.as_deref() else {
            bail!("OPENAI_API_KEY is not set");
        };
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .context("openai request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            bail!("openai returned {status}: {text}");
        }

        let response: ChatCompletionResponse =
            response.json().await.context("openai response invalid")?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("openai response missing content"))
    }
}
