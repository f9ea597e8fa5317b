//! Batch execution: validation, deny-list, safe-mode confirmation,
//! scheduling, per-command deadlines and progress.
//!
//! [`execute_batch`] never fails as a whole. Each command ends in exactly one
//! [`CommandResult`], stored by batch index, so the returned results line up
//! with the submitted commands whatever order the processes finish in.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::command::{
    BLOCKED_COMMANDS_ENV, Command, CommandKind, CommandResult, DEFAULT_BLOCKED_COMMANDS,
    DEFAULT_DIAGNOSTIC_VERB, DEFAULT_SHELL_PREFIX, DenyList,
};
use super::confirm::{Confirmation, Confirmer};
use super::process::run_with_deadline;
use super::progress::{ExecStatus, ProgressCounts, ProgressObserver};
use crate::error::{BatchError, ExecError};
use crate::redact::redact;

/// Appended to the output of a command killed at its deadline.
pub const TIMED_OUT_MARKER: &str = "[TIMED OUT]";

/// Default per-command deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on captured output per command.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 30_000;

/// Capacity of the worker → consumer status queue.
const STATUS_QUEUE_CAPACITY: usize = 32;

// ── Options ─────────────────────────────────────────────────────────

/// How the runnable commands of a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// One task per command.
    Parallel,
    /// One command at a time, in batch order.
    Sequential,
    /// Sequential in safe mode, parallel otherwise.
    #[default]
    Auto,
}

/// Settings for one [`execute_batch`] call.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub safe_mode: bool,
    pub mode: ExecMode,
    pub shell_prefix: String,
    pub diagnostic_verb: String,
    pub blocked_commands: Vec<String>,
    /// Environment variable with extra deny-list entries, read per batch.
    pub blocked_env_var: Option<String>,
    /// `0` disables truncation.
    pub max_output_bytes: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            safe_mode: false,
            mode: ExecMode::Auto,
            shell_prefix: DEFAULT_SHELL_PREFIX.into(),
            diagnostic_verb: DEFAULT_DIAGNOSTIC_VERB.into(),
            blocked_commands: DEFAULT_BLOCKED_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blocked_env_var: Some(BLOCKED_COMMANDS_ENV.into()),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_shell_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.shell_prefix = prefix.into();
        self
    }

    pub fn with_diagnostic_verb(mut self, verb: impl Into<String>) -> Self {
        self.diagnostic_verb = verb.into();
        self
    }

    /// Replace the static deny-list.
    pub fn with_blocked_commands<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_commands = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blocked_env_var(mut self, var: impl Into<String>) -> Self {
        self.blocked_env_var = Some(var.into());
        self
    }

    /// Ignore the deny-list environment variable.
    pub fn without_env_deny_list(mut self) -> Self {
        self.blocked_env_var = None;
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    /// Static rules plus the current contents of the environment variable.
    pub fn deny_list(&self) -> DenyList {
        let list = DenyList::new(&self.blocked_commands);
        match &self.blocked_env_var {
            Some(var) => list.with_env(var),
            None => list,
        }
    }

    fn runs_parallel(&self) -> bool {
        match self.mode {
            ExecMode::Parallel => true,
            ExecMode::Sequential => false,
            ExecMode::Auto => !self.safe_mode,
        }
    }
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Results of a batch, in submission order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<CommandResult>,
    /// Every failure message, when at least one command failed.
    pub error: Option<BatchError>,
    /// Final progress counters.
    pub counts: ProgressCounts,
}

impl BatchOutcome {
    /// Results of commands that ran and exited cleanly.
    pub fn successes(&self) -> impl Iterator<Item = &CommandResult> {
        self.results.iter().filter(|r| r.is_success())
    }
}

// ── Execution ───────────────────────────────────────────────────────

/// Run one batch of commands.
///
/// Invalid and blocked commands are rejected without spawning anything. In
/// safe mode the remaining commands go through a single confirmation; with no
/// `confirmer` the batch is declined. Runnable commands execute concurrently
/// or one at a time (see [`ExecMode`]), each under `opts.timeout`.
pub async fn execute_batch(
    commands: Vec<Command>,
    opts: &ExecOptions,
    confirmer: Option<&dyn Confirmer>,
    observer: &dyn ProgressObserver,
) -> BatchOutcome {
    let total = commands.len();
    if total == 0 {
        return BatchOutcome::default();
    }

    let deny = opts.deny_list();
    let mut slots: Vec<Option<CommandResult>> = vec![None; total];
    let mut runnable = Vec::new();

    for (idx, cmd) in commands.iter().enumerate() {
        if let Err(e) = cmd.validate(&opts.diagnostic_verb, &opts.shell_prefix) {
            warn!("{e}");
            slots[idx] = Some(CommandResult::rejected(cmd.clone(), e));
            continue;
        }
        if cmd.kind() == CommandKind::Diagnostic
            && let Some(rule) = deny.matching_rule(cmd.text(), &opts.diagnostic_verb)
        {
            let e = ExecError::BlockedCommand {
                command: cmd.text().to_string(),
                rule: rule.to_string(),
            };
            warn!("{e}");
            slots[idx] = Some(CommandResult::rejected(cmd.clone(), e));
            continue;
        }
        runnable.push(idx);
    }

    let selected = if opts.safe_mode && !runnable.is_empty() {
        let pending: Vec<Command> = runnable.iter().map(|&i| commands[i].clone()).collect();
        let flags = confirm_batch(&pending, confirmer);
        let mut selected = Vec::new();
        for (pos, &idx) in runnable.iter().enumerate() {
            if flags.get(pos).copied().unwrap_or(false) {
                selected.push(idx);
            } else {
                debug!("skipping `{}`", commands[idx]);
                slots[idx] = Some(CommandResult::skipped(commands[idx].clone()));
            }
        }
        selected
    } else {
        runnable
    };

    let (tx, mut rx) = mpsc::channel::<ExecStatus>(STATUS_QUEUE_CAPACITY);

    let consume = async {
        let mut counts = ProgressCounts::new(total);
        while let Some(status) = rx.recv().await {
            counts.record(status);
            observer.on_progress(&counts);
        }
        counts
    };

    let produce = async {
        let tx = tx;
        for result in slots.iter().flatten() {
            let _ = tx.send(status_of(result)).await;
        }

        if opts.runs_parallel() {
            let mut set = JoinSet::new();
            for &idx in &selected {
                let cmd = commands[idx].clone();
                let tx = tx.clone();
                let timeout = opts.timeout;
                let max_bytes = opts.max_output_bytes;
                set.spawn(async move {
                    let result = run_command(cmd, timeout, max_bytes).await;
                    let _ = tx.send(status_of(&result)).await;
                    (idx, result)
                });
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((idx, result)) => slots[idx] = Some(result),
                    Err(e) => warn!("command worker failed: {e}"),
                }
            }
            for &idx in &selected {
                if slots[idx].is_none() {
                    let cmd = commands[idx].clone();
                    let e = ExecError::Failed {
                        command: cmd.text().to_string(),
                        reason: "worker panicked".into(),
                    };
                    let _ = tx.send(ExecStatus::Failed).await;
                    slots[idx] = Some(CommandResult::failed(cmd, String::new(), e));
                }
            }
        } else {
            for &idx in &selected {
                let result = run_command(commands[idx].clone(), opts.timeout, opts.max_output_bytes).await;
                let _ = tx.send(status_of(&result)).await;
                slots[idx] = Some(result);
            }
        }
    };

    let (counts, ()) = tokio::join!(consume, produce);

    let results: Vec<CommandResult> = commands
        .into_iter()
        .zip(slots)
        .map(|(cmd, slot)| {
            slot.unwrap_or_else(|| {
                let e = ExecError::Failed {
                    command: cmd.text().to_string(),
                    reason: "no result recorded".into(),
                };
                CommandResult::failed(cmd, String::new(), e)
            })
        })
        .collect();

    let failures: Vec<String> = results
        .iter()
        .filter_map(|r| r.error().map(ToString::to_string))
        .collect();
    info!("batch finished: {}", counts.to_log_string());

    BatchOutcome {
        results,
        error: (!failures.is_empty()).then_some(BatchError { failures }),
        counts,
    }
}

/// One flag per pending command.
fn confirm_batch(pending: &[Command], confirmer: Option<&dyn Confirmer>) -> Vec<bool> {
    let Some(confirmer) = confirmer else {
        warn!(
            "safe mode is on but no confirmer is available; skipping {} command(s)",
            pending.len()
        );
        return vec![false; pending.len()];
    };
    match confirmer.confirm(pending) {
        Confirmation::Yes => vec![true; pending.len()],
        Confirmation::No => {
            info!("operator declined {} command(s)", pending.len());
            vec![false; pending.len()]
        }
        Confirmation::Edit => confirmer.select(pending),
    }
}

fn status_of(result: &CommandResult) -> ExecStatus {
    if result.is_skipped() {
        ExecStatus::Skipped
    } else if result.error().is_some() {
        ExecStatus::Failed
    } else {
        ExecStatus::Completed
    }
}

async fn run_command(cmd: Command, timeout: Duration, max_output_bytes: usize) -> CommandResult {
    debug!("running {} command `{cmd}`", cmd.kind());
    let out = match run_with_deadline(cmd.text(), timeout).await {
        Ok(out) => out,
        Err(e) => {
            let e = ExecError::Failed {
                command: cmd.text().to_string(),
                reason: format!("could not start: {e}"),
            };
            warn!("{e}");
            return CommandResult::failed(cmd, String::new(), e);
        }
    };

    // Mask secrets while stdout is still whole: stderr and truncation both
    // break the JSON/YAML parse the redactor relies on.
    let stdout = redact(&String::from_utf8_lossy(&out.stdout));
    let mut output = format_output(stdout.as_bytes(), &out.stderr);
    truncate_output(&mut output, max_output_bytes);

    if out.timed_out() {
        output.push('\n');
        output.push_str(TIMED_OUT_MARKER);
        let e = ExecError::Timeout {
            command: cmd.text().to_string(),
            timeout,
        };
        warn!("{e}");
        return CommandResult::failed(cmd, output, e);
    }

    match out.status.filter(|status| !status.success()) {
        None => {
            debug!("`{cmd}` finished, {} bytes of output", output.len());
            CommandResult::completed(cmd, output)
        }
        Some(status) => {
            let reason = match status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            };
            let e = ExecError::Failed {
                command: cmd.text().to_string(),
                reason,
            };
            warn!("{e}");
            CommandResult::failed(cmd, output, e)
        }
    }
}

/// Stdout, then stderr under a `[stderr]` header when there is any.
pub fn format_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        output.push_str("\n[stderr]\n");
        output.push_str(&String::from_utf8_lossy(stderr));
    }
    output
}

/// Cut `output` to at most `max_bytes` on a char boundary and note the
/// original size.
pub fn truncate_output(output: &mut String, max_bytes: usize) {
    if max_bytes == 0 || output.len() <= max_bytes {
        return;
    }
    let total = output.len();
    let mut cut = max_bytes;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str(&format!("...\n[truncated: {total} bytes total]"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct Scripted {
        answer: Confirmation,
        flags: Vec<bool>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(answer: Confirmation) -> Self {
            Self {
                answer,
                flags: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Confirmer for Scripted {
        fn confirm(&self, _commands: &[Command]) -> Confirmation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }

        fn select(&self, _commands: &[Command]) -> Vec<bool> {
            self.flags.clone()
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressCounts>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, counts: &ProgressCounts) {
            self.0.lock().unwrap().push(*counts);
        }
    }

    fn echo_opts() -> ExecOptions {
        ExecOptions::default()
            .with_diagnostic_verb("echo")
            .without_env_deny_list()
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn truncates_on_char_boundary() {
        let mut s = "héllo wörld".to_string();
        truncate_output(&mut s, 2);
        assert!(s.starts_with("h..."));
        assert!(s.ends_with("[truncated: 13 bytes total]"));

        let mut short = "ok".to_string();
        truncate_output(&mut short, 10);
        assert_eq!(short, "ok");
    }

    #[test]
    fn stderr_gets_a_header() {
        assert_eq!(format_output(b"out\n", b""), "out\n");
        assert_eq!(format_output(b"out\n", b"warn\n"), "out\n\n[stderr]\nwarn\n");
    }

    #[test]
    fn auto_mode_follows_safe_mode() {
        assert!(ExecOptions::default().runs_parallel());
        assert!(!ExecOptions::default().with_safe_mode(true).runs_parallel());
        assert!(
            ExecOptions::default()
                .with_safe_mode(true)
                .with_mode(ExecMode::Parallel)
                .runs_parallel()
        );
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let outcome = execute_batch(Vec::new(), &echo_opts(), None, &Recorder::default()).await;
        assert!(outcome.results.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn results_keep_submission_order() {
        let cmds = vec![
            Command::shell("sleep 0.3; echo first"),
            Command::diagnostic("echo second"),
            Command::shell("echo third"),
        ];
        let outcome = execute_batch(cmds, &echo_opts(), None, &Recorder::default()).await;
        let outputs: Vec<&str> = outcome.results.iter().map(|r| r.output()).collect();
        assert_eq!(outputs, ["first\n", "second\n", "third\n"]);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.counts.completed, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sleeper_times_out_alone() {
        let opts = echo_opts().with_timeout(Duration::from_millis(500));
        let cmds = vec![
            Command::diagnostic("echo a"),
            Command::diagnostic("echo b"),
            Command::shell("echo partial; sleep 30"),
            Command::diagnostic("echo c"),
            Command::diagnostic("echo d"),
        ];
        let start = Instant::now();
        let outcome = execute_batch(cmds, &opts, None, &Recorder::default()).await;
        assert!(start.elapsed() < Duration::from_secs(3));

        for (i, r) in outcome.results.iter().enumerate() {
            if i == 2 {
                assert!(matches!(r.error(), Some(ExecError::Timeout { .. })));
                assert!(r.output().starts_with("partial\n"));
                assert!(r.output().ends_with("\n[TIMED OUT]"));
            } else {
                assert!(r.is_success(), "command {i} should succeed");
            }
        }
        assert_eq!(outcome.error.unwrap().failures.len(), 1);
    }

    #[tokio::test]
    async fn blocked_command_is_rejected() {
        let opts = ExecOptions::default().without_env_deny_list();
        let cmds = vec![
            Command::diagnostic("kubectl get pods"),
            Command::diagnostic("kubectl delete pod x"),
        ];
        let outcome = execute_batch(cmds, &opts, None, &Recorder::default()).await;
        assert!(!matches!(
            outcome.results[0].error(),
            Some(ExecError::BlockedCommand { .. })
        ));
        match outcome.results[1].error() {
            Some(ExecError::BlockedCommand { rule, .. }) => assert_eq!(rule, "delete"),
            other => panic!("expected BlockedCommand, got {other:?}"),
        }
        assert!(outcome.results[1].output().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn blocked_and_invalid_commands_never_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let opts = ExecOptions::default()
            .with_diagnostic_verb("touch")
            .with_blocked_commands(["touch"])
            .without_env_deny_list();
        let cmds = vec![
            Command::diagnostic(format!("touch {}", marker.display())),
            Command::diagnostic(format!("sh -c 'touch {}'", marker.display())),
        ];
        let outcome = execute_batch(cmds, &opts, None, &Recorder::default()).await;
        assert!(matches!(
            outcome.results[0].error(),
            Some(ExecError::BlockedCommand { .. })
        ));
        assert!(matches!(
            outcome.results[1].error(),
            Some(ExecError::InvalidCommand { .. })
        ));
        assert!(!marker.exists());
        assert_eq!(outcome.counts.failed, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chained_diagnostic_command_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let cmds = vec![
            Command::diagnostic(format!("echo get pods;touch {}", marker.display())),
            Command::diagnostic(format!("echo get pods>{}", marker.display())),
        ];
        let outcome = execute_batch(cmds, &echo_opts(), None, &Recorder::default()).await;
        assert!(
            outcome
                .results
                .iter()
                .all(|r| r.error().is_some_and(ExecError::is_rejection))
        );
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn secret_is_masked_before_stderr_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("secret.json");
        std::fs::write(
            &secret,
            r#"{"kind":"Secret","metadata":{"name":"db"},"data":{"password":"aHVudGVyMg=="}}"#,
        )
        .unwrap();
        let script = dir.path().join("get-secret.sh");
        std::fs::write(
            &script,
            format!(
                "cat '{}'\necho 'Warning: v1 Secret is deprecated' >&2\n",
                secret.display()
            ),
        )
        .unwrap();
        let opts = echo_opts().with_diagnostic_verb("sh");
        let cmd = || vec![Command::diagnostic(format!("sh {}", script.display()))];

        let outcome = execute_batch(cmd(), &opts, None, &Recorder::default()).await;
        let output = outcome.results[0].output();
        assert!(outcome.results[0].is_success());
        assert!(!output.contains("aHVudGVyMg=="), "{output}");
        assert!(output.contains("***FILTERED***"));
        assert!(output.contains("\n[stderr]\nWarning: v1 Secret is deprecated"));

        let opts = opts.with_max_output_bytes(70);
        let outcome = execute_batch(cmd(), &opts, None, &Recorder::default()).await;
        let output = outcome.results[0].output();
        assert!(output.contains("[truncated:"));
        assert!(!output.contains("aHVudGVyMg=="), "{output}");
    }

    #[tokio::test]
    async fn env_deny_list_is_read_per_batch() {
        let var = "KUBESAGE_TEST_ENV_DENY_LIST_PER_BATCH";
        let opts = echo_opts().with_blocked_env_var(var);
        let cmd = || vec![Command::diagnostic("echo secret-stuff")];

        let outcome = execute_batch(cmd(), &opts, None, &Recorder::default()).await;
        assert!(outcome.results[0].is_success());

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "echo secret-stuff") };
        let outcome = execute_batch(cmd(), &opts, None, &Recorder::default()).await;
        assert!(matches!(
            outcome.results[0].error(),
            Some(ExecError::BlockedCommand { .. })
        ));
        unsafe { std::env::remove_var(var) };
    }

    #[tokio::test]
    async fn shell_commands_bypass_deny_list() {
        let opts = echo_opts().with_blocked_commands(["rm -rf"]);
        let outcome = execute_batch(
            vec![Command::shell("echo rm -rf nothing")],
            &opts,
            None,
            &Recorder::default(),
        )
        .await;
        assert!(outcome.results[0].is_success());
    }

    #[tokio::test]
    async fn failing_command_keeps_output() {
        let outcome = execute_batch(
            vec![Command::shell("echo partial; echo bad >&2; exit 2")],
            &echo_opts(),
            None,
            &Recorder::default(),
        )
        .await;
        let result = &outcome.results[0];
        assert_eq!(result.output(), "partial\n\n[stderr]\nbad\n");
        match result.error() {
            Some(ExecError::Failed { reason, .. }) => assert_eq!(reason, "exit status 2"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn safe_mode_decline_skips_everything() {
        let opts = echo_opts().with_safe_mode(true);
        let confirmer = Scripted::new(Confirmation::No);
        let cmds = vec![Command::diagnostic("echo a"), Command::diagnostic("echo b")];
        let outcome = execute_batch(cmds, &opts, Some(&confirmer), &Recorder::default()).await;
        assert!(outcome.results.iter().all(|r| r.is_skipped()));
        assert!(outcome.error.is_none());
        assert_eq!(outcome.counts.skipped, 2);
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn safe_mode_without_confirmer_fails_closed() {
        let opts = echo_opts().with_safe_mode(true);
        let outcome = execute_batch(
            vec![Command::diagnostic("echo a")],
            &opts,
            None,
            &Recorder::default(),
        )
        .await;
        assert!(outcome.results[0].is_skipped());
    }

    #[tokio::test]
    async fn safe_mode_edit_runs_selection() {
        let opts = echo_opts().with_safe_mode(true);
        let mut confirmer = Scripted::new(Confirmation::Edit);
        confirmer.flags = vec![false, true];
        let cmds = vec![
            Command::diagnostic("echo a"),
            Command::diagnostic("echo b"),
            Command::diagnostic("echo c"),
        ];
        let outcome = execute_batch(cmds, &opts, Some(&confirmer), &Recorder::default()).await;
        assert!(outcome.results[0].is_skipped());
        assert_eq!(outcome.results[1].output(), "b\n");
        // Missing flag counts as deselected.
        assert!(outcome.results[2].is_skipped());
    }

    #[tokio::test]
    async fn safe_mode_confirms_only_runnable_commands() {
        let opts = echo_opts().with_safe_mode(true);
        let confirmer = Scripted::new(Confirmation::Yes);
        let cmds = vec![
            Command::diagnostic("kubectl get pods"),
            Command::diagnostic("echo ok"),
        ];
        let outcome = execute_batch(cmds, &opts, Some(&confirmer), &Recorder::default()).await;
        assert!(matches!(
            outcome.results[0].error(),
            Some(ExecError::InvalidCommand { .. })
        ));
        assert!(outcome.results[1].is_success());
        assert_eq!(confirmer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let recorder = Recorder::default();
        let cmds = vec![
            Command::diagnostic("echo a"),
            Command::diagnostic("nope"),
            Command::shell("exit 1"),
        ];
        let outcome = execute_batch(cmds, &echo_opts(), None, &recorder).await;
        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        let last = seen.last().unwrap();
        assert!(last.is_done());
        assert_eq!((last.completed, last.failed, last.skipped), (1, 2, 0));
        assert_eq!(*last, outcome.counts);
    }

    #[tokio::test]
    async fn sequential_mode_runs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let opts = echo_opts().with_mode(ExecMode::Sequential);
        let cmds = vec![
            Command::shell(format!("sleep 0.2; echo one >> {}", log.display())),
            Command::shell(format!("echo two >> {}", log.display())),
        ];
        let outcome = execute_batch(cmds, &opts, None, &Recorder::default()).await;
        assert!(outcome.error.is_none());
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }
}
