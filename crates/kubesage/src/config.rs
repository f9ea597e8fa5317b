//! Assistant configuration with defaults.
//!
//! [`AssistantConfig`] gathers everything a diagnostic turn needs: the model,
//! the token budget, how many suggestion attempts to make, execution options
//! and the prompt extensions. The CLI maps its flags onto it.

use std::time::Duration;

use crate::DEFAULT_MODEL;
use crate::api::retry::RetryConfig;
use crate::context::TokenBudget;
use crate::exec::ExecOptions;
use crate::rag::prompt::{DEFAULT_SUB_VERBS, PromptExtension, builtin_extensions};

/// Default number of suggestion attempts per turn.
pub const DEFAULT_RETRIES: u32 = 3;

/// Configuration for a diagnostic session.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Model identifier. Default: `"anthropic/claude-sonnet-4"`.
    pub model: String,
    /// Sampling temperature. Default: `0.2`.
    pub temperature: f32,
    pub budget: TokenBudget,
    /// Suggestion attempts per turn (hard bound). Default: `3`.
    pub retries: u32,
    pub exec: ExecOptions,
    /// Transport retry for provider calls.
    pub api_retry: RetryConfig,
    pub extensions: Vec<PromptExtension>,
    /// Sub-verbs a suggested command may use after the diagnostic verb.
    pub sub_verbs: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            budget: TokenBudget::default(),
            retries: DEFAULT_RETRIES,
            exec: ExecOptions::default(),
            api_retry: RetryConfig::default(),
            extensions: builtin_extensions(),
            sub_verbs: DEFAULT_SUB_VERBS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AssistantConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the suggestion attempt count; `0` is raised to `1`.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn with_exec(mut self, exec: ExecOptions) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.exec.timeout = timeout;
        self
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.exec.safe_mode = safe_mode;
        self
    }

    pub fn with_api_retry(mut self, retry: RetryConfig) -> Self {
        self.api_retry = retry;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<PromptExtension>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_sub_verbs<I, S>(mut self, sub_verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_verbs = sub_verbs.into_iter().map(Into::into).collect();
        self
    }
}
