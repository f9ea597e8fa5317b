//! Context window management: the token budget and history trimming.
//!
//! 1. **[`budget`]**: [`TokenBudget`] splits the model window between the
//!    prompt and the answer.
//!
//! 2. **[`window`]**: [`trim_history`] drops the oldest messages until the
//!    history fits its share of the budget.
//!
//! Both rely on [`crate::tokens::estimate_tokens`].

pub mod budget;
pub mod window;

pub use budget::{DEFAULT_TOKEN_LIMIT, TokenBudget};
pub use window::trim_history;
