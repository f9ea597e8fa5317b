//! Conversation state and turn processing.
//!
//! A [`Session`] is an explicit value owned by the conversation loop and
//! passed by `&mut`; nothing else mutates the history. Each call to
//! [`Session::process_turn`] runs the diagnostic phase, asks the provider for
//! an answer, records both sides of the exchange and trims the history to the
//! prompt budget.
//!
//! Sessions persist as a JSON [`SessionSnapshot`] via [`Session::save`] and
//! [`Session::load`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::context::trim_history;
use crate::error::PipelineError;
use crate::exec::{Command, Confirmer, ProgressObserver};
use crate::rag::{ANSWER_SYSTEM_PROMPT, DiagnosticContext, DiagnosticPipeline, Interrupt};
use crate::tokens::{estimate_tokens, history_tokens};
use crate::{LlmProvider, Message};

/// Conversation state across turns.
#[derive(Debug, Clone)]
pub struct Session {
    /// User and assistant messages, oldest first.
    pub history: Vec<Message>,
    /// Last natural-language question; shell turns leave it unchanged.
    pub last_query: Option<String>,
    /// Number of completed turns.
    pub turn: usize,
    pub created_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub context: DiagnosticContext,
    /// The answer was produced without cluster data.
    pub degraded: bool,
    /// Messages dropped from the head of the history after this turn.
    pub trimmed: usize,
}

/// On-disk form of a [`Session`].
#[derive(Serialize, Deserialize, Debug)]
pub struct SessionSnapshot {
    pub history: Vec<Message>,
    pub last_query: Option<String>,
    pub turn: usize,
    /// RFC 3339 creation time of the session.
    pub created_at: String,
    /// RFC 3339 time the snapshot was written.
    pub timestamp: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            last_query: None,
            turn: 0,
            created_at: Utc::now(),
        }
    }

    /// Process one line of operator input.
    ///
    /// A provider failure while gathering diagnostics degrades the turn; the
    /// question is still answered without cluster data. A provider failure
    /// on the answer call, or an interrupt, ends the turn with an error and
    /// leaves the session unchanged.
    pub async fn process_turn(
        &mut self,
        provider: &dyn LlmProvider,
        config: &AssistantConfig,
        input: &str,
        confirmer: Option<&dyn Confirmer>,
        observer: &dyn ProgressObserver,
        interrupt: &Interrupt,
    ) -> Result<TurnOutcome, PipelineError> {
        let input = input.trim();
        let is_shell = Command::is_shell_input(input, &config.exec.shell_prefix);

        let pipeline = DiagnosticPipeline::new(provider, config)
            .with_confirmer(confirmer)
            .with_observer(observer)
            .with_interrupt(interrupt.clone());
        let context = match pipeline
            .build_diagnostic_context(input, self.last_query.as_deref(), self.turn)
            .await
        {
            Ok(context) => context,
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(PipelineError::Provider(e)) => {
                warn!("diagnostic phase failed, answering without cluster data: {e}");
                let query = match (&self.last_query, is_shell) {
                    (Some(last), true) => last.clone(),
                    _ => input.to_string(),
                };
                DiagnosticContext {
                    text: None,
                    query,
                    results: Vec::new(),
                }
            }
        };
        let degraded = context.text.is_none();
        if degraded {
            warn!("turn {} has no diagnostic context", self.turn + 1);
        }

        if interrupt.is_triggered() {
            return Err(PipelineError::Cancelled);
        }

        let user_content = context
            .text
            .clone()
            .unwrap_or_else(|| context.query.clone());
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(ANSWER_SYSTEM_PROMPT));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(user_content));

        let max_tokens = u32::try_from(config.budget.output_tokens()).unwrap_or(u32::MAX);
        debug!(
            "answer request: {} messages, ~{} prompt tokens, max_tokens {max_tokens}",
            messages.len(),
            history_tokens(&messages)
        );
        let answer = provider
            .generate(&messages, max_tokens)
            .await
            .map_err(PipelineError::Provider)?;
        debug!("answer: ~{} tokens", estimate_tokens(&answer));

        self.history.push(Message::user(input));
        self.history.push(Message::assistant_text(answer.clone()));
        let trimmed = trim_history(&mut self.history, config.budget.input_tokens());

        if !is_shell {
            self.last_query = Some(input.to_string());
        }
        self.turn += 1;
        info!(
            "turn {} done (degraded: {degraded}, history: {} messages)",
            self.turn,
            self.history.len()
        );

        Ok(TurnOutcome {
            answer,
            context,
            degraded,
            trimmed,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            history: self.history.clone(),
            last_query: self.last_query.clone(),
            turn: self.turn,
            created_at: self.created_at.to_rfc3339(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Result<Self, String> {
        let created_at = DateTime::parse_from_rfc3339(&snapshot.created_at)
            .map_err(|e| format!("Invalid session timestamp '{}': {e}", snapshot.created_at))?
            .with_timezone(&Utc);
        Ok(Self {
            history: snapshot.history,
            last_query: snapshot.last_query,
            turn: snapshot.turn,
            created_at,
        })
    }

    /// Write the session as pretty JSON (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create history dir: {e}"))?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| format!("Failed to serialize session: {e}"))?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, json).map_err(|e| format!("Failed to write session: {e}"))?;
        std::fs::rename(&tmp_path, path).map_err(|e| format!("Failed to rename session: {e}"))?;
        debug!("saved session ({} messages) to {}", self.history.len(), path.display());
        Ok(())
    }

    /// Load a session written by [`save`](Self::save). A missing file
    /// yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, String> {
        if !path.exists() {
            return Ok(None);
        }
        let json =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read session: {e}"))?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&json).map_err(|e| format!("Failed to parse session: {e}"))?;
        Self::from_snapshot(snapshot).map(Some)
    }
}
