//! The diagnostic retrieval loop: suggest, execute, aggregate, bound, wrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::assemble::{aggregate, bound_context};
use super::parse::extract_commands;
use super::prompt::{analysis_prompt, suggestion_prompt};
use crate::config::AssistantConfig;
use crate::error::{AttemptError, PipelineError};
use crate::exec::{
    BatchOutcome, Command, CommandResult, Confirmer, NoopObserver, ProgressObserver,
    execute_batch,
};
use crate::tokens::estimate_tokens;
use crate::{LlmProvider, Message};

/// Token cap for the suggestion reply; a handful of command lines.
const SUGGESTION_MAX_TOKENS: u32 = 512;

/// Outcome of one attempt; a retryable failure keeps the batch results.
type AttemptResult = Result<BatchOutcome, (AttemptError, Vec<CommandResult>)>;

/// Cooperative cancellation flag, checked between suggestion attempts.
///
/// Clones share the flag, so a signal handler can hold one while the
/// pipeline holds another.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before the next turn.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Grounding context for one turn.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    /// Analysis prompt with the bounded, redacted output, or `None` when
    /// nothing usable was collected.
    pub text: Option<String>,
    /// The natural-language question the context answers.
    pub query: String,
    /// Results of the last executed batch.
    pub results: Vec<CommandResult>,
}

/// Drives one diagnostic phase against a provider.
pub struct DiagnosticPipeline<'a> {
    provider: &'a dyn LlmProvider,
    config: &'a AssistantConfig,
    confirmer: Option<&'a dyn Confirmer>,
    observer: &'a dyn ProgressObserver,
    interrupt: Interrupt,
}

impl<'a> DiagnosticPipeline<'a> {
    pub fn new(provider: &'a dyn LlmProvider, config: &'a AssistantConfig) -> Self {
        Self {
            provider,
            config,
            confirmer: None,
            observer: &NoopObserver,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Option<&'a dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Build the grounding context for `query`.
    ///
    /// Input behind the shell prefix runs as-is, without suggestion or
    /// confirmation, and the context answers `last_query`. Anything else
    /// goes through up to `config.retries` suggest-and-execute attempts;
    /// `turn_index > 0` adds `last_query` to the suggestion prompt.
    ///
    /// A batch the operator declined or deselected ends the loop. Exhausted
    /// attempts are not an error either: the returned context has no text.
    /// Provider failures and interrupts are.
    pub async fn build_diagnostic_context(
        &self,
        query: &str,
        last_query: Option<&str>,
        turn_index: usize,
    ) -> Result<DiagnosticContext, PipelineError> {
        let exec = &self.config.exec;

        if Command::is_shell_input(query, &exec.shell_prefix) {
            let command = Command::from_input(query, &exec.shell_prefix);
            let effective = last_query.unwrap_or(command.text()).to_string();
            info!("running operator command `{command}`");
            let opts = exec.clone().with_safe_mode(false);
            let outcome = execute_batch(vec![command], &opts, None, self.observer).await;
            return Ok(self.finish(effective, outcome.results));
        }

        let previous = if turn_index > 0 { last_query } else { None };
        let retries = self.config.retries.max(1);
        let mut last_results = Vec::new();

        for attempt in 1..=retries {
            if self.interrupt.is_triggered() {
                info!("diagnostic phase interrupted before attempt {attempt}");
                return Err(PipelineError::Cancelled);
            }

            match self.attempt(query, previous).await? {
                Ok(outcome) => return Ok(self.finish(query.to_string(), outcome.results)),
                Err((e, results)) => {
                    warn!("attempt {attempt}/{retries}: {e}");
                    last_results = results;
                }
            }
        }

        warn!("no diagnostic data after {retries} attempt(s); answering without cluster context");
        Ok(DiagnosticContext {
            text: None,
            query: query.to_string(),
            results: last_results,
        })
    }

    /// One suggest-and-execute round.
    async fn attempt(
        &self,
        query: &str,
        previous: Option<&str>,
    ) -> Result<AttemptResult, PipelineError> {
        let exec = &self.config.exec;
        let prompt = suggestion_prompt(
            query,
            previous,
            &exec.diagnostic_verb,
            &self.config.sub_verbs,
            &self.config.extensions,
        );
        debug!("suggestion prompt: ~{} tokens", estimate_tokens(&prompt));

        let messages = [Message::system(prompt), Message::user(query)];
        let reply = self
            .provider
            .generate(&messages, SUGGESTION_MAX_TOKENS)
            .await
            .map_err(PipelineError::Provider)?;

        let commands: Vec<Command> =
            extract_commands(&reply, &exec.diagnostic_verb, &self.config.sub_verbs)
                .into_iter()
                .map(Command::diagnostic)
                .collect();
        if commands.is_empty() {
            debug!("unusable suggestion reply: {reply}");
            return Ok(Err((AttemptError::NoCommandsSuggested, Vec::new())));
        }
        info!("executing {} suggested command(s)", commands.len());

        let outcome = execute_batch(commands, exec, self.confirmer, self.observer).await;
        if let Some(e) = &outcome.error {
            debug!("{e}");
        }
        if outcome.successes().next().is_none() {
            // A skipped command is the operator's answer; suggesting again
            // would only ask them again.
            if outcome.results.iter().any(CommandResult::is_skipped) {
                info!("operator skipped the suggested commands");
                return Ok(Ok(outcome));
            }
            return Ok(Err((AttemptError::EmptyResultSet, outcome.results)));
        }
        Ok(Ok(outcome))
    }

    fn finish(&self, query: String, results: Vec<CommandResult>) -> DiagnosticContext {
        let aggregated = aggregate(&results);
        let text = if aggregated.is_empty() {
            None
        } else {
            let bounded = bound_context(&aggregated, self.config.budget.limit);
            Some(analysis_prompt(&query, &bounded))
        };
        DiagnosticContext {
            text,
            query,
            results,
        }
    }
}
