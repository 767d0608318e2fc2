// OpenAI chat-completions streaming client using reqwest-eventsource.
//
// Sends a single user message with `stream: true` and accumulates the
// `choices[0].delta.content` fragments until the `[DONE]` sentinel.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use gridiron_core::config::{Config, LlmConfig};

/// Data payload that terminates an OpenAI stream.
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM not configured (set OPENAI_API_KEY)")]
    NotConfigured,

    #[error("failed to create event source: {0}")]
    Request(String),

    #[error("{0}")]
    Stream(String),

    #[error("no response within {secs}s")]
    Timeout { secs: u64 },

    #[error("stream ended without any content")]
    EmptyResponse,

    #[error("could not parse model response as JSON: {message}")]
    Parse { message: String, response: String },
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

/// Collected result of one streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Low-level chat-completions streaming client.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: String, settings: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Send `prompt` as a single user message and collect the streamed reply.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured);
        }
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, self.stream(prompt))
            .await
            .map_err(|_| LlmError::Timeout { secs })?
    }

    async fn stream(&self, prompt: &str) -> Result<Completion, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": true,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let request = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = request
            .eventsource()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let mut text = String::new();
        let mut finish_reason = None;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    if msg.data.trim() == DONE_SENTINEL {
                        debug!("stream complete");
                        break;
                    }
                    if let Some(fragment) = parse_delta_content(&msg.data) {
                        text.push_str(&fragment);
                    }
                    if let Some(reason) = parse_finish_reason(&msg.data) {
                        debug!(reason, "finish_reason");
                        finish_reason = Some(reason);
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    return Err(LlmError::Stream(extract_error_message(&err)));
                }
            }
        }
        es.close();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(Completion {
            text,
            finish_reason,
        })
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either a configured OpenAI client or a disabled stand-in.
pub enum LlmClient {
    Active(OpenAiClient),
    Disabled,
}

impl LlmClient {
    /// `Active` when an OpenAI key is present in credentials.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.openai_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(OpenAiClient::new(key.clone(), &config.llm))
            }
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }

    pub async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        match self {
            LlmClient::Active(client) => client.complete(prompt).await,
            LlmClient::Disabled => Err(LlmError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `choices[0].delta.content` from a chunk.
///
/// Expected shape: `{ "choices": [ { "delta": { "content": "..." } } ] }`
pub(crate) fn parse_delta_content(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `choices[0].finish_reason` when the chunk carries one.
pub(crate) fn parse_finish_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("choices")?
        .get(0)?
        .get("finish_reason")?
        .as_str()
        .map(|s| s.to_string())
}

fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::InvalidContentType(_, _) => {
            "API did not return an event stream".to_string()
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
