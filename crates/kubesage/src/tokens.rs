//! Tokenizer-agnostic token estimation.
//!
//! Every size decision in the crate (history trimming, context bounding,
//! answer budgets) goes through [`estimate_tokens`]. Word runs and individual
//! punctuation characters each count as one token. This over-counts
//! punctuation-heavy text such as YAML and under-counts long words, which is
//! acceptable for budgeting but not for billing.

use std::sync::LazyLock;

use regex::Regex;

use crate::Message;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+|[^\w\s]").expect("token pattern is a valid regex")
});

/// Approximate number of LLM tokens in `text`.
pub fn estimate_tokens(text: &str) -> usize {
    TOKEN_RE.find_iter(text).count()
}

/// Approximate tokens of a single message (content only).
pub fn message_tokens(message: &Message) -> usize {
    message.content.as_deref().map_or(0, estimate_tokens)
}

/// Sum of [`message_tokens`] over a conversation.
pub fn history_tokens(history: &[Message]) -> usize {
    history.iter().map(message_tokens).sum()
}
