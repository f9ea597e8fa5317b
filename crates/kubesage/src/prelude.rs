//! Convenience re-exports for common `kubesage` types.
//!
//! ```
//! use kubesage::prelude::*;
//!
//! let config = AssistantConfig::default().with_safe_mode(true);
//! let session = Session::new();
//! assert_eq!(session.turn, 0);
//! assert!(config.exec.safe_mode);
//! ```
//!
//! Prompt builders, parsing helpers and the assembly functions stay in their
//! modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{LlmFuture, LlmProvider, Message, MessageRole, OpenRouterClient};

// ── Provider ────────────────────────────────────────────────────────
pub use crate::api::OpenRouterProvider;
pub use crate::api::retry::RetryConfig;

// ── Configuration and errors ────────────────────────────────────────
pub use crate::config::AssistantConfig;
pub use crate::error::{AttemptError, BatchError, ExecError, PipelineError};

// ── Execution ───────────────────────────────────────────────────────
pub use crate::exec::{
    AutoConfirm, BatchOutcome, Command, CommandKind, CommandResult, Confirmation, Confirmer,
    ExecMode, ExecOptions, FnObserver, LoggingObserver, NoopObserver, ProgressCounts,
    ProgressObserver, execute_batch,
};

// ── Retrieval and context ───────────────────────────────────────────
pub use crate::context::{TokenBudget, trim_history};
pub use crate::rag::{DiagnosticContext, DiagnosticPipeline, Interrupt, PromptExtension};
pub use crate::redact::redact;
pub use crate::session::{Session, SessionSnapshot, TurnOutcome};
pub use crate::tokens::estimate_tokens;
