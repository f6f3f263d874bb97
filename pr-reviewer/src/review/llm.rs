//! Thin client for the completion service.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint; the default is
//! Gemini's OpenAI compatibility layer. Always requests a JSON object
//! response so the comment list can be parsed deterministically.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ConfigError, LlmError};
use crate::secrets::SecretStore;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Completion endpoint configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Builds the config from environment variables, reading the API key
    /// from the given secret store.
    ///
    /// - `LLM_BASE_URL` — OpenAI-compatible endpoint base.
    /// - `LLM_MODEL` — model name.
    pub fn from_env(secrets: &SecretStore) -> Result<Self, ConfigError> {
        let base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = secrets.get("gemini_api_key")?;
        Ok(Self {
            base_url,
            model,
            api_key,
            temperature: 0.2,
            max_tokens: 8192,
        })
    }
}

/// Chat-completions client (one endpoint, one model).
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    cfg: LlmConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    n: u32,
    response_format: ResponseFormat<'a>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(cfg: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { http, cfg })
    }

    /// Runs one chat completion and returns the raw content of choice 0.
    pub async fn generate(&self, system_prompt: &str, user_query: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        let req = ChatRequest {
            model: &self.cfg.model,
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
            n: 1,
            response_format: ResponseFormat { kind: "json_object" },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_query,
                },
            ],
        };

        debug!("llm.generate model={} url={}", self.cfg.model, url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyChoices)?;
        choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("choice has no content".into()))
    }
}
