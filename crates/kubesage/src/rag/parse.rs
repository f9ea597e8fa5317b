//! Extraction of diagnostic commands from free-form model output.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>\s]+>").expect("placeholder regex is valid"));

/// Pull `<verb> <sub-verb> ...` commands out of `response`.
///
/// A match runs to the end of its line or the next backtick. Surrounding
/// quotes and trailing punctuation are trimmed, matches containing a
/// `<placeholder>` are dropped, and exact repeats are removed keeping the
/// first occurrence.
///
/// ```
/// use kubesage::rag::parse::extract_commands;
///
/// let reply = "1. `kubectl get pods -A`\n2. kubectl logs <pod>\n- kubectl get pods -A";
/// let subs = vec!["get".to_string(), "logs".to_string()];
/// assert_eq!(extract_commands(reply, "kubectl", &subs), ["kubectl get pods -A"]);
/// ```
pub fn extract_commands(response: &str, verb: &str, sub_verbs: &[String]) -> Vec<String> {
    if sub_verbs.is_empty() {
        return Vec::new();
    }
    let alternatives = sub_verbs
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?m)(?:^|[^\w-]){}\s+(?:{alternatives})(?:[ \t][^\n`]*)?(?:$|[\n`])",
        regex::escape(verb)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!("cannot build command pattern: {e}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut commands = Vec::new();
    for m in re.find_iter(response) {
        let Some(start) = m.as_str().find(verb) else {
            continue;
        };
        let raw = m.as_str().get(start..).unwrap_or_default();
        let cmd = clean(raw);
        if PLACEHOLDER.is_match(&cmd) {
            debug!("dropping placeholder command: {cmd}");
            continue;
        }
        if seen.insert(cmd.clone()) {
            commands.push(cmd);
        }
    }
    commands
}

fn clean(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\'', '`', '.', ',', ';', ':'])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::prompt::DEFAULT_SUB_VERBS;

    fn subs() -> Vec<String> {
        DEFAULT_SUB_VERBS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_plain_lines() {
        let reply = "kubectl get pods -n web\nkubectl describe deployment web -n web\n";
        assert_eq!(
            extract_commands(reply, "kubectl", &subs()),
            [
                "kubectl get pods -n web",
                "kubectl describe deployment web -n web"
            ]
        );
    }

    #[test]
    fn cuts_at_backticks_and_trims_punctuation() {
        let reply = "Run `kubectl get events -A` and then \"kubectl top nodes\".";
        assert_eq!(
            extract_commands(reply, "kubectl", &subs()),
            ["kubectl get events -A", "kubectl top nodes"]
        );
    }

    #[test]
    fn ignores_disallowed_sub_verbs() {
        let reply = "kubectl delete pod web\nkubectl getter\nkubectl get ns";
        assert_eq!(extract_commands(reply, "kubectl", &subs()), ["kubectl get ns"]);
    }

    #[test]
    fn drops_placeholders_and_duplicates() {
        let reply = "kubectl logs <pod-name> -n web\nkubectl get pods\nkubectl  get   pods\n";
        assert_eq!(extract_commands(reply, "kubectl", &subs()), ["kubectl get pods"]);
    }

    #[test]
    fn verb_must_stand_alone() {
        let reply = "mykubectl get pods\nkubectl-foo get pods";
        assert!(extract_commands(reply, "kubectl", &subs()).is_empty());
    }

    #[test]
    fn empty_reply_yields_nothing() {
        assert!(extract_commands("No commands needed.", "kubectl", &subs()).is_empty());
    }
}
