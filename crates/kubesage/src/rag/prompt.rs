//! Prompt assembly for command suggestion, analysis and answering.
//!
//! [`PromptBuilder`] joins headed sections with blank lines. The suggestion
//! prompt lists the allowed sub-verbs and appends every [`PromptExtension`]
//! whose keywords occur in the question.

use serde::{Deserialize, Serialize};

/// Sub-verbs a suggested diagnostic command may use.
///
/// `rollout` is allowed for `status`/`history`; its mutating forms are on the
/// deny-list.
pub const DEFAULT_SUB_VERBS: &[&str] = &[
    "get",
    "describe",
    "logs",
    "top",
    "events",
    "explain",
    "rollout",
    "api-resources",
    "api-versions",
    "cluster-info",
    "version",
];

/// System prompt for the final answer call.
pub const ANSWER_SYSTEM_PROMPT: &str = "\
You are kubesage, an assistant that diagnoses Kubernetes clusters. \
Answer from the cluster data you are given; when no data is provided, say \
so and answer from general Kubernetes knowledge. Be concise, name the \
resources involved, and suggest read-only commands for anything you could \
not verify.";

// ── PromptBuilder ───────────────────────────────────────────────────

/// Builder for multi-section prompts.
///
/// ```
/// use kubesage::rag::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("You are a cluster expert.")
///     .section("Question", "why is web crashing?")
///     .section_opt("Previous question", None::<String>)
///     .build();
/// assert!(prompt.contains("## Question\n\nwhy is web crashing?"));
/// assert!(!prompt.contains("Previous question"));
/// ```
pub struct PromptBuilder {
    sections: Vec<String>,
}

impl PromptBuilder {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    /// Append a section only if the content is `Some`.
    pub fn section_opt(self, heading: &str, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(heading, c),
            None => self,
        }
    }

    /// Append raw text without a heading. Skipped if empty.
    pub fn raw(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(content);
        }
        self
    }

    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

// ── Extensions ──────────────────────────────────────────────────────

/// Extra suggestion instructions for a family of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptExtension {
    pub name: String,
    /// Lowercase fragments; any one occurring in the question activates the
    /// extension.
    pub keywords: Vec<String>,
    pub instructions: String,
}

impl PromptExtension {
    pub fn new<I, S>(name: impl Into<String>, keywords: I, instructions: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
            instructions: instructions.into(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.keywords.iter().any(|k| query.contains(k.as_str()))
    }
}

/// Networking, rollout, storage and scheduling extensions.
pub fn builtin_extensions() -> Vec<PromptExtension> {
    vec![
        PromptExtension::new(
            "networking",
            [
                "network", "service", "ingress", "dns", "endpoint", "connection", "port",
                "unreachable", "refused",
            ],
            "For connectivity problems inspect services and their endpoints, \
             ingresses, network policies and the DNS pods in kube-system, e.g. \
             `kubectl get endpoints -A`, `kubectl get networkpolicies -A`, \
             `kubectl logs -n kube-system -l k8s-app=kube-dns --tail=50`.",
        ),
        PromptExtension::new(
            "rollout",
            ["rollout", "deploy", "rollback", "replica", "image", "upgrade"],
            "For rollout problems check rollout status and history, the \
             replica sets of the deployment and recent events, e.g. \
             `kubectl rollout status deployment/NAME`, \
             `kubectl get replicasets -o wide`.",
        ),
        PromptExtension::new(
            "storage",
            ["volume", "pvc", "storage", "mount", "disk", "persistent"],
            "For storage problems list persistent volume claims, persistent \
             volumes and storage classes, and describe claims that are not Bound.",
        ),
        PromptExtension::new(
            "scheduling",
            [
                "pending", "schedul", "node", "taint", "affinity", "evict", "insufficient",
            ],
            "For scheduling problems inspect node conditions and allocatable \
             resources, pending pods and their events, e.g. `kubectl describe nodes`, \
             `kubectl get pods -A --field-selector=status.phase=Pending`.",
        ),
    ]
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt asking for a newline-separated list of read-only commands.
pub fn suggestion_prompt(
    query: &str,
    previous_query: Option<&str>,
    verb: &str,
    sub_verbs: &[String],
    extensions: &[PromptExtension],
) -> String {
    let allowed = sub_verbs
        .iter()
        .map(|s| format!("- `{verb} {s}`"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut builder = PromptBuilder::new(format!(
        "You are a Kubernetes troubleshooting expert. Suggest up to 5 read-only \
         `{verb}` commands whose output would help answer the user's question. \
         Reply with one command per line and nothing else."
    ))
    .section("Allowed commands", allowed)
    .section(
        "Rules",
        "Use concrete resource names from the question when given; otherwise \
         list resources across namespaces (`-A`). Never use placeholders such \
         as <pod-name>. Never suggest commands that modify the cluster.",
    );

    for ext in extensions.iter().filter(|e| e.matches(query)) {
        builder = builder.section(&format!("Hints: {}", ext.name), ext.instructions.as_str());
    }

    builder
        .section_opt("Previous question", previous_query)
        .section("Question", query)
        .build()
}

/// Analysis template wrapping the bounded command output.
pub fn analysis_prompt(query: &str, data: &str) -> String {
    PromptBuilder::new(
        "You are a Kubernetes expert analysing live output from the user's \
         cluster. Base your answer on this data.",
    )
    .section("Question", query)
    .section("Cluster data", data)
    .section(
        "Answer format",
        "Start with a one-sentence diagnosis. Then list the evidence with the \
         resource names involved, and finish with concrete next steps. Use \
         Markdown; quote commands in backticks. If the data does not explain \
         the problem, say what is missing.",
    )
    .build()
}
