//! Token budget: how a model's context window is split between the prompt
//! (history + diagnostic context) and the generated answer.

use serde::{Deserialize, Serialize};

/// Default context window size in tokens.
pub const DEFAULT_TOKEN_LIMIT: usize = 8192;

/// Token budget for one conversation.
///
/// The prompt side gets `input_reserve_percent` of `limit`, never less than
/// `min_input_reserve`, and never so much that fewer than `min_output_tokens`
/// remain for the answer.
///
/// # Example
///
/// ```
/// use kubesage::context::TokenBudget;
///
/// let budget = TokenBudget::new(10_000).with_input_reserve_percent(80);
/// assert_eq!(budget.input_tokens(), 8_000);
/// assert_eq!(budget.output_tokens(), 2_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Total context window in tokens.
    pub limit: usize,
    /// Share of `limit` reserved for the prompt, in percent.
    pub input_reserve_percent: u8,
    /// Floor for the prompt share.
    pub min_input_reserve: usize,
    /// Floor for the answer share.
    pub min_output_tokens: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TOKEN_LIMIT,
            input_reserve_percent: 75,
            min_input_reserve: 1024,
            min_output_tokens: 512,
        }
    }
}

impl TokenBudget {
    /// Create a budget with the given window and default reserves.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn with_input_reserve_percent(mut self, percent: u8) -> Self {
        self.input_reserve_percent = percent.min(100);
        self
    }

    pub fn with_min_input_reserve(mut self, tokens: usize) -> Self {
        self.min_input_reserve = tokens;
        self
    }

    pub fn with_min_output_tokens(mut self, tokens: usize) -> Self {
        self.min_output_tokens = tokens;
        self
    }

    /// Tokens available for history plus diagnostic context.
    pub fn input_tokens(&self) -> usize {
        let share = self.limit * usize::from(self.input_reserve_percent.min(100)) / 100;
        share
            .max(self.min_input_reserve)
            .min(self.limit.saturating_sub(self.min_output_tokens))
    }

    /// Tokens available for the generated answer.
    pub fn output_tokens(&self) -> usize {
        self.limit
            .saturating_sub(self.input_tokens())
            .max(self.min_output_tokens)
    }
}
