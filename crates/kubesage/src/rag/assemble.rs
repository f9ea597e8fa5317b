//! Aggregation of command results into one text block, and size bounding.

use tracing::{debug, warn};

use crate::exec::CommandResult;
use crate::redact::redact;
use crate::tokens::estimate_tokens;

/// Separator written after every aggregated command section.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

/// Inserted where middle sections were dropped by [`bound_context`].
pub const OMISSION_MARKER: &str = "(Some command outputs were omitted for brevity)";

/// Appended after a hard character truncation.
pub const ELLIPSIS: &str = "...";

/// Redacted output of every successful result, in batch order.
///
/// Failed results are logged and left out; skipped ones are left out
/// silently.
pub fn aggregate(results: &[CommandResult]) -> String {
    let mut out = String::new();
    for result in results {
        if let Some(e) = result.error() {
            warn!("leaving out `{}`: {e}", result.command());
            continue;
        }
        if result.is_skipped() {
            continue;
        }
        out.push_str(&format!(
            "Command: {}\n\nOutput:\n{}{SECTION_DELIMITER}",
            result.command(),
            redact(result.output())
        ));
    }
    out
}

/// Keep `text` within `2 * limit` estimated tokens.
///
/// Over budget with two or more sections, only the first and last survive,
/// joined by [`OMISSION_MARKER`]. If that is still too large, or there are
/// fewer than two sections, the text is cut by characters and ends with
/// [`ELLIPSIS`].
pub fn bound_context(text: &str, limit: usize) -> String {
    let budget = limit.saturating_mul(2);
    let tokens = estimate_tokens(text);
    if tokens <= budget {
        return text.to_string();
    }

    let sections: Vec<&str> = text
        .split(SECTION_DELIMITER)
        .filter(|s| !s.trim().is_empty())
        .collect();

    if let [first, .., last] = sections.as_slice() {
        let kept = format!(
            "{first}{SECTION_DELIMITER}{OMISSION_MARKER}{SECTION_DELIMITER}{last}{SECTION_DELIMITER}"
        );
        debug!(
            "context ~{tokens} tokens over budget {budget}; kept first and last of {} sections",
            sections.len()
        );
        if estimate_tokens(&kept) <= budget {
            return kept;
        }
        return truncate_to_tokens(&kept, budget);
    }

    truncate_to_tokens(text, budget)
}

/// Shrink a character prefix of `text` until, with [`ELLIPSIS`] appended,
/// it fits in `budget` tokens.
fn truncate_to_tokens(text: &str, budget: usize) -> String {
    let total_chars = text.chars().count();
    let tokens = estimate_tokens(text).max(1);
    let mut keep = (total_chars.saturating_mul(budget) / tokens).min(total_chars);

    loop {
        let mut candidate: String = text.chars().take(keep).collect();
        candidate.push_str(ELLIPSIS);
        if keep == 0 || estimate_tokens(&candidate) <= budget {
            debug!("hard-truncated context to {keep} of {total_chars} chars");
            return candidate;
        }
        keep = keep * 9 / 10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Command, CommandResult};
    use crate::error::ExecError;

    fn ok(cmd: &str, output: &str) -> CommandResult {
        CommandResult::completed(Command::diagnostic(cmd), output.to_string())
    }

    #[test]
    fn aggregates_successes_in_order() {
        let failed = CommandResult::failed(
            Command::diagnostic("kubectl get nodes"),
            "partial".into(),
            ExecError::Failed {
                command: "kubectl get nodes".into(),
                reason: "exit status 1".into(),
            },
        );
        let results = vec![
            ok("kubectl get pods", "web-1 Running"),
            failed,
            CommandResult::skipped(Command::diagnostic("kubectl get svc")),
            ok("kubectl get ns", "default"),
        ];
        assert_eq!(
            aggregate(&results),
            "Command: kubectl get pods\n\nOutput:\nweb-1 Running\n\n---\n\n\
             Command: kubectl get ns\n\nOutput:\ndefault\n\n---\n\n"
        );
    }

    #[test]
    fn aggregation_redacts_output() {
        let secret = r#"{"kind":"Secret","data":{"token":"dG9w"}}"#;
        let text = aggregate(&[ok("kubectl get secret s -o json", secret)]);
        assert!(text.contains("***FILTERED***"));
        assert!(!text.contains("dG9w"));
    }

    #[test]
    fn small_context_is_untouched() {
        let text = aggregate(&[ok("kubectl get pods", "web-1 Running")]);
        assert_eq!(bound_context(&text, 1000), text);
    }

    #[test]
    fn large_context_keeps_first_and_last() {
        // ~10 000 tokens across 20 sections, limit 1 000.
        let results: Vec<CommandResult> = (0..20)
            .map(|i| ok(&format!("kubectl get pods -n ns{i}"), &"pod ".repeat(490)))
            .collect();
        let text = aggregate(&results);
        assert!(estimate_tokens(&text) > 9_000);

        let bounded = bound_context(&text, 1_000);
        assert!(bounded.starts_with("Command: kubectl get pods -n ns0\n"));
        assert!(bounded.contains(OMISSION_MARKER));
        assert!(bounded.contains("Command: kubectl get pods -n ns19\n"));
        assert!(!bounded.contains("ns10"));
        assert!(estimate_tokens(&bounded) < 2_000);
    }

    #[test]
    fn single_section_is_hard_truncated() {
        let text = aggregate(&[ok("kubectl logs web", &"line ".repeat(5_000))]);
        let bounded = bound_context(&text, 100);
        assert!(bounded.ends_with(ELLIPSIS));
        assert!(estimate_tokens(&bounded) <= 200);
        assert!(bounded.starts_with("Command: kubectl logs web"));
    }

    #[test]
    fn oversized_first_and_last_are_truncated_too() {
        let results = vec![
            ok("kubectl logs a", &"x ".repeat(3_000)),
            ok("kubectl logs b", "b"),
            ok("kubectl logs c", &"y ".repeat(3_000)),
        ];
        let bounded = bound_context(&aggregate(&results), 500);
        assert!(bounded.ends_with(ELLIPSIS));
        assert!(estimate_tokens(&bounded) <= 1_000);
    }
}
