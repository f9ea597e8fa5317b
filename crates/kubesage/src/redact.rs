//! Sensitive-data redaction for command output.
//!
//! Two paths, chosen by what the output parses as:
//!
//! - **Structured** (JSON, else YAML) with a top-level `kind`: for `Secret`
//!   and `ConfigMap` objects, and for each item of a `List`, every non-empty
//!   string under `data` and `stringData` becomes [`REDACTION_MARKER`]. The
//!   document is re-serialised in its own format. Other kinds are returned
//!   unchanged.
//! - **Text** (`kubectl describe` style): inside an object introduced by a
//!   `Name:` line directly followed by `Namespace:`, a `Data` section
//!   underlined with `====` is replaced by a single marker line.
//!
//! [`redact`] is pure and idempotent.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

/// Replacement for redacted values and sections.
pub const REDACTION_MARKER: &str = "***FILTERED***";

const DATA_FIELDS: [&str; 2] = ["data", "stringData"];

/// Redact secret values from `output`.
///
/// ```
/// use kubesage::redact::redact;
///
/// let json = r#"{"kind":"Secret","metadata":{"name":"db"},"data":{"password":"aHVudGVyMg=="}}"#;
/// let out = redact(json);
/// assert!(out.contains("***FILTERED***"));
/// assert!(!out.contains("aHVudGVyMg=="));
/// assert_eq!(redact(&out), out);
/// ```
pub fn redact(output: &str) -> String {
    if let Some(structured) = redact_structured(output) {
        return structured;
    }
    redact_describe(output)
}

// ── Structured path ─────────────────────────────────────────────────

/// `None` when `output` is not a mapping with a string `kind`.
fn redact_structured(output: &str) -> Option<String> {
    if let Ok(mut value) = serde_json::from_str::<JsonValue>(output) {
        let kind = value.get("kind")?.as_str()?.to_string();
        if !is_sensitive_kind(&kind) && !is_list_kind(&kind) {
            return Some(output.to_string());
        }
        redact_json(&mut value);
        return Some(serde_json::to_string_pretty(&value).unwrap_or_else(|_| output.to_string()));
    }

    let mut value = serde_yaml::from_str::<YamlValue>(output).ok()?;
    if !value.is_mapping() {
        return None;
    }
    let kind = value.get("kind")?.as_str()?.to_string();
    if !is_sensitive_kind(&kind) && !is_list_kind(&kind) {
        return Some(output.to_string());
    }
    redact_yaml(&mut value);
    Some(serde_yaml::to_string(&value).unwrap_or_else(|_| output.to_string()))
}

fn is_sensitive_kind(kind: &str) -> bool {
    matches!(kind, "Secret" | "ConfigMap")
}

fn is_list_kind(kind: &str) -> bool {
    kind == "List" || kind.ends_with("List")
}

fn redact_json(value: &mut JsonValue) {
    let Some(kind) = value
        .get("kind")
        .and_then(JsonValue::as_str)
        .map(str::to_owned)
    else {
        return;
    };
    if is_list_kind(&kind) {
        if let Some(items) = value.get_mut("items").and_then(JsonValue::as_array_mut) {
            items.iter_mut().for_each(redact_json);
        }
    } else if is_sensitive_kind(&kind) {
        for field in DATA_FIELDS {
            if let Some(data) = value.get_mut(field).and_then(JsonValue::as_object_mut) {
                for v in data.values_mut() {
                    if let JsonValue::String(s) = v
                        && !s.is_empty()
                    {
                        *s = REDACTION_MARKER.to_string();
                    }
                }
            }
        }
    }
}

fn redact_yaml(value: &mut YamlValue) {
    let Some(kind) = value
        .get("kind")
        .and_then(YamlValue::as_str)
        .map(str::to_owned)
    else {
        return;
    };
    if is_list_kind(&kind) {
        if let Some(items) = value.get_mut("items").and_then(YamlValue::as_sequence_mut) {
            items.iter_mut().for_each(redact_yaml);
        }
    } else if is_sensitive_kind(&kind) {
        for field in DATA_FIELDS {
            if let Some(data) = value.get_mut(field).and_then(YamlValue::as_mapping_mut) {
                for v in data.values_mut() {
                    if let YamlValue::String(s) = v
                        && !s.is_empty()
                    {
                        *s = REDACTION_MARKER.to_string();
                    }
                }
            }
        }
    }
}

// ── Text path ───────────────────────────────────────────────────────

fn redact_describe(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut in_object = false;
    let mut i = 0;

    while i < lines.len() {
        if is_object_header(&lines, i) {
            in_object = true;
        }
        if in_object && is_data_header(&lines, i) {
            out.push(lines[i]);
            out.push(lines[i + 1]);
            out.push(REDACTION_MARKER);
            i += 2;
            // A blank line before the next header is kept so the layout
            // survives a second pass unchanged.
            let mut last_blank = false;
            while i < lines.len() && !ends_data_section(&lines, i) {
                last_blank = lines[i].trim().is_empty();
                i += 1;
            }
            if last_blank {
                out.push("");
            }
            continue;
        }
        out.push(lines[i]);
        i += 1;
    }

    out.join("\n")
}

fn is_object_header(lines: &[&str], i: usize) -> bool {
    lines[i].starts_with("Name:")
        && lines
            .get(i + 1)
            .is_some_and(|next| next.starts_with("Namespace:"))
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| c == '=')
}

fn is_section_header(lines: &[&str], i: usize) -> bool {
    !lines[i].trim().is_empty() && lines.get(i + 1).is_some_and(|next| is_rule(next))
}

fn is_data_header(lines: &[&str], i: usize) -> bool {
    lines[i].trim_start().starts_with("Data") && is_section_header(lines, i)
}

fn ends_data_section(lines: &[&str], i: usize) -> bool {
    is_section_header(lines, i)
        || lines[i].trim_start().starts_with("Events:")
        || is_object_header(lines, i)
}
