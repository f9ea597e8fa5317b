//! Error taxonomy for command execution and the diagnostic pipeline.
//!
//! Per-command failures ([`ExecError`]) are values stored inside each
//! [`CommandResult`](crate::exec::CommandResult); they never abort a batch.
//! [`BatchError`] aggregates them for callers that only want a summary.
//! [`AttemptError`] drives the retrieval pipeline's retry loop, and
//! [`PipelineError`] is the only error that escapes a diagnostic turn.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single command inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// Command text does not have the shape of a diagnostic or shell command.
    #[error("invalid command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    /// Command matched a deny-list entry and was not started.
    #[error("command `{command}` blocked by deny-list rule `{rule}`")]
    BlockedCommand { command: String, rule: String },

    /// Deadline exceeded; the process group was killed.
    #[error("command `{command}` timed out after {}s", timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    /// Non-zero exit status, or the process could not be started.
    #[error("command `{command}` failed: {reason}")]
    Failed { command: String, reason: String },
}

impl ExecError {
    /// Whether the command was rejected before a process was spawned.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExecError::InvalidCommand { .. } | ExecError::BlockedCommand { .. }
        )
    }
}

/// Every failure of a batch, joined into one message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} command(s) failed: {}", failures.len(), failures.join("; "))]
pub struct BatchError {
    pub failures: Vec<String>,
}

/// Outcome of one suggestion attempt that should trigger a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("the model did not suggest any usable diagnostic command")]
    NoCommandsSuggested,
    #[error("every suggested command failed")]
    EmptyResultSet,
}

/// Errors that end a diagnostic turn early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The LLM provider call failed (after its own transport retries).
    #[error("LLM provider error: {0}")]
    Provider(String),
    /// The operator interrupted the turn.
    #[error("interrupted")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_duration() {
        let err = ExecError::Timeout {
            command: "kubectl logs -f web".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "command `kubectl logs -f web` timed out after 5s"
        );
    }

    #[test]
    fn blocked_message_names_rule() {
        let err = ExecError::BlockedCommand {
            command: "kubectl delete pod x".into(),
            rule: "delete".into(),
        };
        assert!(err.to_string().contains("rule `delete`"));
        assert!(err.is_rejection());
    }

    #[test]
    fn batch_error_joins_failures() {
        let err = BatchError {
            failures: vec!["a failed".into(), "b failed".into()],
        };
        assert_eq!(err.to_string(), "2 command(s) failed: a failed; b failed");
    }
}
