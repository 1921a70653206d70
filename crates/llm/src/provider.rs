use std::time::Duration;

use async_trait::async_trait;
use bookly_core::config::{LlmConfig, LlmProvider};
use bookly_core::{Message, MessageRole};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";
const ANTHROPIC_DEFAULT_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm provider returned {status}: {detail}")]
    Provider { status: u16, detail: String },
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion over the conversation so far. `instructions` is the
    /// system prompt; the caller owns all prompt content.
    async fn complete(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError>;
}

/// Provider-dispatching HTTP client for OpenAI, Anthropic and Ollama.
pub struct HttpLlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self { http, config })
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or_default()
    }

    fn base_url(&self, default: &str) -> String {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    async fn complete_once(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(history, instructions).await,
            LlmProvider::Anthropic => self.complete_anthropic(history, instructions).await,
            LlmProvider::Ollama => self.complete_ollama(history, instructions).await,
        }
    }

    async fn complete_openai(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError> {
        let mut messages = vec![json!({"role": "system", "content": instructions})];
        messages.extend(chat_messages(history));

        let body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url(OPENAI_DEFAULT_BASE)))
            .bearer_auth(self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let payload = check_status::<OpenAiResponse>(response).await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Transport("completion had no choices".to_string()))
    }

    async fn complete_anthropic(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": 1024,
            "system": instructions,
            "messages": chat_messages(history),
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url(ANTHROPIC_DEFAULT_BASE)))
            .header("x-api-key", self.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let payload = check_status::<AnthropicResponse>(response).await?;
        payload
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LlmError::Transport("message had no text content".to_string()))
    }

    async fn complete_ollama(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError> {
        let mut messages = vec![json!({"role": "system", "content": instructions})];
        messages.extend(chat_messages(history));

        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });

        let base = self.base_url("http://localhost:11434");
        let response = self
            .http
            .post(format!("{base}/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let payload = check_status::<OllamaResponse>(response).await?;
        Ok(payload.message.content)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(
        &self,
        history: &[Message],
        instructions: &str,
    ) -> Result<String, LlmError> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.complete_once(history, instructions).await {
                Ok(completion) => return Ok(completion),
                Err(error) if is_retryable(&error) => {
                    debug!(
                        event_name = "llm.retry",
                        attempt,
                        error = %error,
                        "retrying llm completion"
                    );
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Transport("llm retries exhausted".to_string())))
    }
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Transport(_) => true,
        LlmError::Provider { status, .. } => *status == 429 || *status >= 500,
    }
}

fn chat_messages(history: &[Message]) -> Vec<Value> {
    history
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::User => "user",
                MessageRole::Agent => "assistant",
            };
            json!({"role": role, "content": message.text})
        })
        .collect()
}

async fn check_status<T>(response: reqwest::Response) -> Result<T, LlmError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
        return Err(LlmError::Provider { status: status.as_u16(), detail });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| LlmError::Transport(format!("could not parse provider response: {error}")))
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}
