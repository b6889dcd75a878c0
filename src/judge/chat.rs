// Client for OpenAI-compatible chat-completions endpoints.
//
// Works with llama.cpp's server, LM Studio, vLLM, Ollama's /v1 shim and the
// hosted OpenAI API. Only the request/response subset the LLM judge needs is
// modeled. Transport failures are split into "could not reach the service"
// (connect errors and timeouts) and "reached it, but the call failed" so the
// judge can label them separately.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AttributionError, Result};

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send one request and return the generated text.
    ///
    /// Fails with `JudgeConnection` when the service can't be reached or the
    /// call times out, and with `JudgeInference` for everything else.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiChatClient {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8080/v1`. The
    /// timeout bounds the whole request, body included.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for the LLM API")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = self.endpoint();

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AttributionError::JudgeInference(format!(
                "LLM API returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(transport_error)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                AttributionError::JudgeInference("LLM API returned no choices".to_string())
            })?;

        debug!(url = %url, reply_len = content.len(), "LLM API replied");

        Ok(content)
    }
}

/// Map a reqwest failure onto the judge error kinds.
fn transport_error(err: reqwest::Error) -> AttributionError {
    let detail = error_chain(&err);
    if err.is_connect() || err.is_timeout() {
        AttributionError::JudgeConnection(detail)
    } else {
        AttributionError::JudgeInference(detail)
    }
}

/// "outer: inner: root"; reqwest's top-level message alone rarely says
/// what actually went wrong.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// --- Chat-completions response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}
