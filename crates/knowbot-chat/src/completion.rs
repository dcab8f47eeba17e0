//! Completion client: the adapter to the external LLM API.
//!
//! - `DeepSeekClient` talks to an OpenAI-compatible `/chat/completions`
//!   endpoint over HTTPS. This is the production backend.
//! - `FnCompletionClient` answers from a closure, for tests and offline runs.
//!
//! Neither retries. A failed or timed-out call surfaces as a
//! [`CompletionError`] and the caller decides what the user sees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use knowbot_core::config::LlmConfig;
use knowbot_core::{Role, Turn};
use serde::{Deserialize, Serialize};

use crate::sanitize::sanitize_html;

/// Maximum number of characters of an error body kept in [`CompletionError::Status`].
const ERROR_BODY_LIMIT: usize = 300;

/// Errors from the completion API.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion client misconfigured: {0}")]
    Config(String),
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response could not be decoded: {0}")]
    Decode(String),
    #[error("completion response contained no choices")]
    EmptyResponse,
}

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub history: Vec<Turn>,
    pub message: String,
}

impl CompletionRequest {
    /// Flatten into the role-tagged message list sent on the wire:
    /// system prompt, then history in order, then the new user message.
    pub fn to_messages(&self) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: self.system_prompt.clone(),
        });
        messages.extend(self.history.iter().map(|turn| WireMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }));
        messages.push(WireMessage {
            role: Role::User.as_str().to_string(),
            content: self.message.clone(),
        });
        messages
    }
}

/// Adapter to a text-completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a reply for the given prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

// =============================================================================
// DeepSeek (OpenAI-compatible) client
// =============================================================================

/// One chat message in the OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for DeepSeek's OpenAI-compatible chat completions endpoint.
pub struct DeepSeekClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl DeepSeekClient {
    /// Build a client from configuration, resolving the API key from the
    /// config or its environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        Self::new(config, config.resolve_api_key(), config.timeout())
    }

    /// Build a client with an explicit API key and request timeout.
    pub fn new(
        config: &LlmConfig,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(CompletionError::Config("base_url must not be empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionClient for DeepSeekClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: request.to_messages(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut builder = self.http.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let started = std::time::Instant::now();
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout)
            } else {
                CompletionError::Decode(e.to_string())
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = content.chars().count(),
            "Completion received"
        );

        Ok(sanitize_html(&content))
    }
}

// =============================================================================
// Closure-backed client
// =============================================================================

type CompletionFn = dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

/// Completion client that answers from a closure and counts its calls.
pub struct FnCompletionClient {
    handler: Box<CompletionFn>,
    calls: AtomicUsize,
}

impl FnCompletionClient {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `reply`.
    pub fn fixed(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Always fail with a transport error carrying `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move |_| Err(CompletionError::Transport(reason.clone())))
    }

    /// Number of completed or failed calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FnCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(request)
    }
}
