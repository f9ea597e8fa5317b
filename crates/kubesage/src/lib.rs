//! Conversational Kubernetes diagnostics grounded in live cluster output.
//!
//! `kubesage` answers natural-language questions about a cluster. For every
//! question it asks an LLM which read-only `kubectl` commands would help,
//! runs them under a deny-list, a per-command timeout and an optional
//! operator confirmation, redacts secret material from the output, and packs
//! what is left into a bounded context block that grounds the final answer.
//!
//! # Where to find things
//!
//! - **Run commands:** [`exec::execute_batch`] with [`exec::ExecOptions`].
//!   Commands are tagged once as [`exec::CommandKind::Diagnostic`] or
//!   [`exec::CommandKind::Shell`] by [`exec::Command::from_input`].
//!   Progress is reported through [`exec::ProgressObserver`]; safe-mode
//!   confirmation goes through [`exec::Confirmer`].
//!
//! - **Build grounding context:** [`rag::DiagnosticPipeline`] drives the
//!   suggest → execute → redact → bound loop and returns a
//!   [`rag::DiagnosticContext`].
//!
//! - **Keep a conversation:** [`session::Session`] owns the history and
//!   processes whole turns; [`context::trim_history`] keeps the history under
//!   its [`context::TokenBudget`].
//!
//! - **Strip secrets:** [`redact::redact`].
//!
//! - **Estimate size:** [`tokens::estimate_tokens`].
//!
//! - **Talk to a model:** implement [`LlmProvider`], or use
//!   [`api::OpenRouterProvider`] backed by [`OpenRouterClient`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`exec`] | Command model, validation, deny-list, process-group timeouts, batch scheduling |
//! | [`rag`] | Command suggestion prompts, response parsing, aggregation and bounding |
//! | [`redact`] | Secret / ConfigMap redaction for JSON, YAML and `describe` output |
//! | [`context`] | Token budget and head-first history trimming |
//! | [`session`] | Explicit session object, turn processing, history snapshots |
//! | [`api`] | OpenRouter provider with transient-error retry |
//! | [`config`] | [`AssistantConfig`](config::AssistantConfig) with defaults |

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod prelude;
pub mod rag;
pub mod redact;
pub mod session;
pub mod tokens;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for suggestion and answer calls.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
        }
    }
}

// ── LLM capability ─────────────────────────────────────────────────

/// Boxed future returned by [`LlmProvider::generate`].
pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// The single LLM capability the pipeline consumes.
///
/// Implementors own latency, transport retries and provider selection. An
/// empty string is a valid answer; callers decide what to make of it.
///
/// Uses a boxed future so that the trait is dyn-compatible.
pub trait LlmProvider: Send + Sync {
    fn generate<'a>(&'a self, messages: &'a [Message], max_tokens: u32) -> LlmFuture<'a>;
}

// ── Request / response types ───────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_headers(api_key, "https://github.com/tacryt-socryp/kubesage", "kubesage")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("kubesage/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        match parsed.choices.and_then(|c| c.into_iter().next()) {
            Some(c) => Ok(ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            }),
            None => {
                debug!("LLM output: empty (no choices)");
                Ok(ChatCompletion {
                    content: None,
                    usage: parsed.usage,
                    finish_reason: None,
                })
            }
        }
    }
}
