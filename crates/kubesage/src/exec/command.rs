//! Command model: tagged commands, shape validation, deny-list matching and
//! per-command results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Default prefix marking operator-typed shell commands (`$ top -b -n1`).
pub const DEFAULT_SHELL_PREFIX: &str = "$";

/// Default diagnostic verb every suggested command must start with.
pub const DEFAULT_DIAGNOSTIC_VERB: &str = "kubectl";

/// Environment variable holding extra comma-separated deny-list entries.
pub const BLOCKED_COMMANDS_ENV: &str = "KUBESAGE_BLOCKED_COMMANDS";

/// Default deny-list (matched case-insensitively, see [`DenyList`]).
///
/// Mutating `kubectl` verbs, interactive/streaming verbs that never return,
/// and shell constructs that write or destroy.
pub const DEFAULT_BLOCKED_COMMANDS: &[&str] = &[
    "delete",
    "apply",
    "create",
    "edit",
    "patch",
    "replace",
    "scale",
    "autoscale",
    "rollout restart",
    "rollout undo",
    "rollout pause",
    "rollout resume",
    "drain",
    "cordon",
    "uncordon",
    "taint",
    "label",
    "annotate",
    "set",
    "expose",
    "run",
    "exec",
    "attach",
    "cp",
    "port-forward",
    "proxy",
    "certificate",
    "rm -rf",
    "mkfs",
    ">",
    ">>",
];

/// How a command entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Suggested by the model; must start with the diagnostic verb and is
    /// subject to the deny-list.
    Diagnostic,
    /// Typed by the operator after the shell prefix; bypasses the deny-list.
    Shell,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Diagnostic => write!(f, "diagnostic"),
            CommandKind::Shell => write!(f, "shell"),
        }
    }
}

/// A command tagged with its kind. The kind is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    kind: CommandKind,
    text: String,
}

impl Command {
    pub fn diagnostic(text: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Diagnostic,
            text: text.into().trim().to_string(),
        }
    }

    /// A shell command. `text` is the command line without the prefix.
    pub fn shell(text: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Shell,
            text: text.into().trim().to_string(),
        }
    }

    /// Classify raw operator input: text behind `shell_prefix` becomes a
    /// [`CommandKind::Shell`] command, anything else a diagnostic one.
    pub fn from_input(input: &str, shell_prefix: &str) -> Self {
        let trimmed = input.trim();
        match strip_shell_prefix(trimmed, shell_prefix) {
            Some(rest) => Self::shell(rest),
            None => Self::diagnostic(trimmed),
        }
    }

    /// Whether `input` is an operator shell command.
    pub fn is_shell_input(input: &str, shell_prefix: &str) -> bool {
        strip_shell_prefix(input.trim(), shell_prefix).is_some()
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Check the command's shape.
    ///
    /// Diagnostic commands must start with `diagnostic_verb` as a whole
    /// word and may not chain, pipe, redirect or substitute outside single
    /// quotes. Shell commands only need to be non-empty.
    pub fn validate(&self, diagnostic_verb: &str, shell_prefix: &str) -> Result<(), ExecError> {
        if self.text.is_empty() {
            return Err(ExecError::InvalidCommand {
                command: self.text.clone(),
                reason: "empty command".into(),
            });
        }
        match self.kind {
            CommandKind::Shell => Ok(()),
            CommandKind::Diagnostic => {
                if self.text.split_whitespace().next() != Some(diagnostic_verb) {
                    return Err(ExecError::InvalidCommand {
                        command: self.text.clone(),
                        reason: format!(
                            "must start with `{diagnostic_verb}` or the shell prefix `{shell_prefix}`"
                        ),
                    });
                }
                match find_shell_operator(&self.text) {
                    Some(op) => Err(ExecError::InvalidCommand {
                        command: self.text.clone(),
                        reason: format!("shell operator `{op}` is not allowed"),
                    }),
                    None => Ok(()),
                }
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// First shell operator in `text` that `sh -c` would act on.
///
/// Single quotes make everything literal. Double quotes still allow
/// command substitution. A backslash escapes the next character outside
/// single quotes.
fn find_shell_operator(text: &str) -> Option<&'static str> {
    #[derive(Clone, Copy)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut quote = Quote::None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::Single, '\'') => quote = Quote::None,
            (Quote::Single, _) => {}
            (_, '\\') => {
                chars.next();
            }
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::Double, '"') => quote = Quote::None,
            (_, '`') => return Some("`"),
            (_, '$') if chars.peek() == Some(&'(') => return Some("$("),
            (Quote::None, ';') => return Some(";"),
            (Quote::None, '&') => return Some("&"),
            (Quote::None, '|') => return Some("|"),
            (Quote::None, '>') => return Some(">"),
            (Quote::None, '<') => return Some("<"),
            (Quote::None, '\n') => return Some("newline"),
            _ => {}
        }
    }
    None
}

fn strip_shell_prefix<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    input.strip_prefix(prefix).map(str::trim_start)
}

// ── Deny-list ───────────────────────────────────────────────────────

/// Blocked command patterns.
///
/// Rules and commands are lowercased and whitespace-normalised before
/// matching, with shell operator characters (`; & | < >` and backticks)
/// split into words of their own, so `pods;rm -rf` and `yaml>/tmp/x` match
/// like their spaced forms. A rule matches when the command starts with it
/// (with or without the leading diagnostic verb), or when it appears as a
/// whitespace-delimited run of words anywhere in the command.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    rules: Vec<String>,
}

impl DenyList {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        list.extend(rules);
        list
    }

    /// Add rules; blank entries are ignored.
    pub fn extend<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            let rule = normalize(rule.as_ref());
            if !rule.is_empty() && !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
    }

    /// Append the comma-separated entries of environment variable `var`.
    /// Unset or non-unicode variables add nothing.
    pub fn with_env(mut self, var: &str) -> Self {
        if let Ok(value) = std::env::var(var) {
            self.extend(value.split(','));
        }
        self
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// The first rule that blocks `command`, if any.
    pub fn matching_rule(&self, command: &str, diagnostic_verb: &str) -> Option<&str> {
        let normalized = normalize(command);
        let verb_prefix = format!("{} ", diagnostic_verb.to_lowercase());
        let without_verb = normalized
            .strip_prefix(&verb_prefix)
            .unwrap_or(&normalized);
        let padded = format!(" {normalized} ");

        self.rules
            .iter()
            .find(|rule| {
                normalized.starts_with(rule.as_str())
                    || without_verb.starts_with(rule.as_str())
                    || padded.contains(&format!(" {rule} "))
            })
            .map(String::as_str)
    }
}

const OPERATOR_CHARS: [char; 6] = [';', '&', '|', '<', '>', '`'];

fn normalize(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len());
    for c in text.chars() {
        if OPERATOR_CHARS.contains(&c) {
            spaced.push(' ');
            spaced.push(c);
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ── Results ─────────────────────────────────────────────────────────

/// Outcome of one command. Output may be non-empty when `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    command: Command,
    output: String,
    error: Option<ExecError>,
    skipped: bool,
}

impl CommandResult {
    pub(crate) fn completed(command: Command, output: String) -> Self {
        Self {
            command,
            output,
            error: None,
            skipped: false,
        }
    }

    pub(crate) fn failed(command: Command, output: String, error: ExecError) -> Self {
        Self {
            command,
            output,
            error: Some(error),
            skipped: false,
        }
    }

    pub(crate) fn rejected(command: Command, error: ExecError) -> Self {
        Self::failed(command, String::new(), error)
    }

    pub(crate) fn skipped(command: Command) -> Self {
        Self {
            command,
            output: String::new(),
            error: None,
            skipped: true,
        }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&ExecError> {
        self.error.as_ref()
    }

    /// Not run because the operator declined or deselected it.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Ran and exited cleanly.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_tags_shell_prefix() {
        let cmd = Command::from_input("$  ps aux | head", "$");
        assert_eq!(cmd.kind(), CommandKind::Shell);
        assert_eq!(cmd.text(), "ps aux | head");

        let cmd = Command::from_input("kubectl get pods", "$");
        assert_eq!(cmd.kind(), CommandKind::Diagnostic);
        assert!(!Command::is_shell_input("kubectl get pods", "$"));
        assert!(Command::is_shell_input("  $ uptime", "$"));
    }

    #[test]
    fn empty_prefix_never_matches() {
        assert_eq!(Command::from_input("ls", "").kind(), CommandKind::Diagnostic);
    }

    #[test]
    fn diagnostic_must_start_with_verb() {
        assert!(Command::diagnostic("kubectl get pods").validate("kubectl", "$").is_ok());
        let err = Command::diagnostic("kubectlx get pods")
            .validate("kubectl", "$")
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand { .. }));
        assert!(err.to_string().contains("must start with `kubectl`"));
        assert!(Command::diagnostic("rm -rf /").validate("kubectl", "$").is_err());
    }

    #[test]
    fn shell_only_needs_text() {
        assert!(Command::shell("uptime").validate("kubectl", "$").is_ok());
        assert!(Command::shell("   ").validate("kubectl", "$").is_err());
    }

    #[test]
    fn deny_list_matches_verb_prefix() {
        let deny = DenyList::new(DEFAULT_BLOCKED_COMMANDS);
        assert_eq!(
            deny.matching_rule("kubectl delete pod x", "kubectl"),
            Some("delete")
        );
        assert_eq!(
            deny.matching_rule("KUBECTL   Rollout  Restart deploy/web", "kubectl"),
            Some("rollout restart")
        );
        assert_eq!(deny.matching_rule("kubectl get pods", "kubectl"), None);
        assert_eq!(
            deny.matching_rule("kubectl rollout status deploy/web", "kubectl"),
            None
        );
    }

    #[test]
    fn deny_list_matches_whole_words_only() {
        let deny = DenyList::new(["exec", "rm -rf"]);
        assert_eq!(
            deny.matching_rule("kubectl get pods | xargs rm -rf", "kubectl"),
            Some("rm -rf")
        );
        assert_eq!(
            deny.matching_rule("kubectl describe pod exec-worker", "kubectl"),
            None
        );
        assert_eq!(
            deny.matching_rule("kubectl get pods -l run=nginx", "kubectl"),
            None
        );
    }

    #[test]
    fn deny_list_blocks_redirects() {
        let deny = DenyList::new(DEFAULT_BLOCKED_COMMANDS);
        assert_eq!(
            deny.matching_rule("kubectl get pods > /tmp/out", "kubectl"),
            Some(">")
        );
    }

    #[test]
    fn deny_list_splits_unspaced_operators() {
        let deny = DenyList::new(DEFAULT_BLOCKED_COMMANDS);
        assert_eq!(
            deny.matching_rule("kubectl get secret db -o yaml>/tmp/x", "kubectl"),
            Some(">")
        );
        assert_eq!(
            deny.matching_rule("kubectl get pods;rm -rf /tmp/x", "kubectl"),
            Some("rm -rf")
        );
        assert_eq!(
            deny.matching_rule("kubectl logs web>>/tmp/log", "kubectl"),
            Some(">")
        );
        assert_eq!(
            deny.matching_rule("kubectl get pods -o wide", "kubectl"),
            None
        );
    }

    #[test]
    fn diagnostic_rejects_shell_operators() {
        for text in [
            "kubectl get secret db -o yaml>/tmp/x",
            "kubectl get pods;rm -rf /tmp/x",
            "kubectl get pods && kubectl delete pod x",
            "kubectl get pods | sh",
            "kubectl logs $(cat /tmp/pod)",
            "kubectl logs \"`cat /tmp/pod`\"",
            "kubectl get pods < /dev/null",
            "kubectl get pods\nrm -rf /",
        ] {
            let err = Command::diagnostic(text).validate("kubectl", "$").unwrap_err();
            assert!(
                err.to_string().contains("shell operator"),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn quoted_operators_are_literal() {
        for text in [
            "kubectl get pods -o jsonpath='{range .items[*]}{.metadata.name};{end}'",
            "kubectl get pods -l 'tier in (web,db)'",
            "kubectl get pods --field-selector status.phase!=Running",
            "kubectl get events --field-selector reason=BackOff\\;x",
        ] {
            assert!(
                Command::diagnostic(text).validate("kubectl", "$").is_ok(),
                "{text}"
            );
        }
        // Substitution still runs inside double quotes.
        assert!(
            Command::diagnostic("kubectl logs \"$(whoami)\"")
                .validate("kubectl", "$")
                .is_err()
        );
        // The operator's own commands are not restricted.
        assert!(Command::shell("kubectl get pods | grep web").validate("kubectl", "$").is_ok());
    }

    #[test]
    fn deny_list_reads_env() {
        let var = "KUBESAGE_TEST_DENY_LIST_READS_ENV";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "top, ,Logs --previous") };
        let deny = DenyList::new(Vec::<String>::new()).with_env(var);
        assert_eq!(deny.rules(), ["top", "logs --previous"]);
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn result_flags() {
        let ok = CommandResult::completed(Command::diagnostic("kubectl get ns"), "x".into());
        assert!(ok.is_success());
        let skipped = CommandResult::skipped(Command::diagnostic("kubectl get ns"));
        assert!(!skipped.is_success());
        assert!(skipped.error().is_none());
    }
}
