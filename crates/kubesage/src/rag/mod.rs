//! Diagnostic retrieval: turn a question into grounding context.
//!
//! 1. **[`prompt`]** builds the suggestion prompt (allowed sub-verbs plus any
//!    matching [`PromptExtension`]) and the analysis template.
//! 2. **[`parse`]** pulls commands out of the model's reply.
//! 3. [`crate::exec::execute_batch`] runs them.
//! 4. **[`assemble`]** redacts and aggregates successful output and bounds its
//!    size.
//!
//! [`DiagnosticPipeline`] drives the loop with a hard attempt count and an
//! [`Interrupt`] checked between attempts.

pub mod assemble;
pub mod parse;
pub mod pipeline;
pub mod prompt;

pub use assemble::{OMISSION_MARKER, SECTION_DELIMITER, aggregate, bound_context};
pub use parse::extract_commands;
pub use pipeline::{DiagnosticContext, DiagnosticPipeline, Interrupt};
pub use prompt::{
    ANSWER_SYSTEM_PROMPT, DEFAULT_SUB_VERBS, PromptBuilder, PromptExtension, analysis_prompt,
    builtin_extensions, suggestion_prompt,
};
