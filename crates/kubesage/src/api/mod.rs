//! LLM provider plumbing: the OpenRouter-backed [`LlmProvider`] and
//! transport-level retry.
//!
//! - [`retry`]: exponential backoff for transient HTTP/network failures.
//! - [`OpenRouterProvider`]: binds an [`OpenRouterClient`] to a model,
//!   temperature and [`RetryConfig`](retry::RetryConfig).

pub mod retry;

use crate::{ChatRequest, LlmFuture, LlmProvider, Message, OpenRouterClient};
use retry::RetryConfig;

/// [`LlmProvider`] that sends every request to OpenRouter.
pub struct OpenRouterProvider {
    client: OpenRouterClient,
    model: String,
    temperature: f32,
    retry: RetryConfig,
}

impl OpenRouterProvider {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.2,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmProvider for OpenRouterProvider {
    fn generate<'a>(&'a self, messages: &'a [Message], max_tokens: u32) -> LlmFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: Some(self.model.clone()),
                messages: messages.to_vec(),
                max_tokens,
                temperature: self.temperature,
                ..Default::default()
            };
            let completion = retry::retry_call(&self.retry, || self.client.chat(&body)).await?;
            Ok(completion.content.unwrap_or_default())
        })
    }
}
