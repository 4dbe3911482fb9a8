use std::collections::BTreeMap;
use std::fmt;

use recon_core::truncate_chars;
use recon_types::{MatchStatus, ResponseBody};
use serde_json::{Map, Number, Value};

/// Marker that opens the detail of every comparison lacking two JSON bodies.
pub const MISSING_OR_INVALID_JSON: &str = "Missing or invalid JSON";

const MAX_RENDERED_ENTRIES: usize = 50;
const VALUE_SNIPPET_CHARS: usize = 80;
const TEXT_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiffKind {
    Changed,
    Added,
    Removed,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// One structural difference. `added` means present on target only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub path: String,
    pub detail: String,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind.as_str(), self.path, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyComparison {
    pub status: MatchStatus,
    pub detail: String,
}

impl BodyComparison {
    fn matched() -> Self {
        Self {
            status: MatchStatus::Match,
            detail: String::new(),
        }
    }

    fn not_matched(detail: String) -> Self {
        Self {
            status: MatchStatus::NotMatch,
            detail,
        }
    }
}

/// Classifies a source/target body pair.
///
/// Two JSON bodies are compared structurally, two text bodies byte for byte.
/// Anything else, including a missing side, is a `NotMatch` whose detail starts
/// with [`MISSING_OR_INVALID_JSON`].
pub fn compare_bodies(
    source: Option<&ResponseBody>,
    target: Option<&ResponseBody>,
) -> BodyComparison {
    match (source, target) {
        (Some(ResponseBody::Json(source)), Some(ResponseBody::Json(target))) => {
            let entries = diff_json(source, target);
            if entries.is_empty() {
                BodyComparison::matched()
            } else {
                BodyComparison::not_matched(render_diff(&entries))
            }
        }
        (Some(ResponseBody::Text(source)), Some(ResponseBody::Text(target))) => {
            if source == target {
                BodyComparison::matched()
            } else {
                BodyComparison::not_matched(format!(
                    "text bodies differ; source: {}; target: {}",
                    truncate_chars(source, TEXT_SNIPPET_CHARS),
                    truncate_chars(target, TEXT_SNIPPET_CHARS)
                ))
            }
        }
        _ => BodyComparison::not_matched(format!(
            "{MISSING_OR_INVALID_JSON}: {}",
            describe_unusable(source, target)
        )),
    }
}

fn describe_unusable(source: Option<&ResponseBody>, target: Option<&ResponseBody>) -> String {
    let describe = |label: &str, body: Option<&ResponseBody>| match body {
        None => Some(format!("{label} body missing")),
        Some(ResponseBody::Text(_)) => Some(format!("{label} body is not JSON")),
        Some(ResponseBody::Json(_)) => None,
    };
    [describe("source", source), describe("target", target)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Order-insensitive normal form: object keys sorted, arrays sorted by their
/// serialized canonical elements. Numbers keep their representation, so `1`
/// and `1.0` stay distinct.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            let mut canonical = Map::new();
            for (key, value) in sorted {
                canonical.insert(key.clone(), value);
            }
            Value::Object(canonical)
        }
        Value::Array(items) => {
            let mut keyed: Vec<(String, Value)> = items
                .iter()
                .map(|item| {
                    let canonical = canonicalize(item);
                    (canonical.to_string(), canonical)
                })
                .collect();
            keyed.sort_by(|left, right| left.0.cmp(&right.0));
            Value::Array(keyed.into_iter().map(|(_, value)| value).collect())
        }
        other => other.clone(),
    }
}

/// Structural differences between two JSON documents, ignoring array order.
pub fn diff_json(source: &Value, target: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_values("$", &canonicalize(source), &canonicalize(target), &mut entries);
    entries
}

fn diff_values(path: &str, source: &Value, target: &Value, entries: &mut Vec<DiffEntry>) {
    if source == target {
        return;
    }
    match (source, target) {
        (Value::Object(source), Value::Object(target)) => {
            for (key, source_value) in source {
                let child = child_path(path, key);
                match target.get(key) {
                    Some(target_value) => diff_values(&child, source_value, target_value, entries),
                    None => entries.push(DiffEntry {
                        kind: DiffKind::Removed,
                        path: child,
                        detail: snippet(source_value),
                    }),
                }
            }
            for (key, target_value) in target {
                if !source.contains_key(key) {
                    entries.push(DiffEntry {
                        kind: DiffKind::Added,
                        path: child_path(path, key),
                        detail: snippet(target_value),
                    });
                }
            }
        }
        (Value::Array(source), Value::Array(target)) => diff_arrays(path, source, target, entries),
        _ => {
            let mut detail = format!("{} -> {}", snippet(source), snippet(target));
            if let (Value::Number(source), Value::Number(target)) = (source, target) {
                if number_kind(source) != number_kind(target) {
                    detail.push_str(&format!(
                        " (type {} -> {})",
                        number_kind(source),
                        number_kind(target)
                    ));
                }
            }
            entries.push(DiffEntry {
                kind: DiffKind::Changed,
                path: path.to_string(),
                detail,
            });
        }
    }
}

fn number_kind(number: &Number) -> &'static str {
    if number.is_f64() {
        "float"
    } else {
        "int"
    }
}

/// Multiset difference of two canonical arrays. A single element swapped for
/// another container is descended into for a finer path.
fn diff_arrays(path: &str, source: &[Value], target: &[Value], entries: &mut Vec<DiffEntry>) {
    let mut counts: BTreeMap<String, (i64, &Value)> = BTreeMap::new();
    for item in source {
        counts.entry(item.to_string()).or_insert((0, item)).0 += 1;
    }
    for item in target {
        counts.entry(item.to_string()).or_insert((0, item)).0 -= 1;
    }

    let element_path = format!("{path}[*]");
    let removed: Vec<(i64, &Value)> = counts
        .values()
        .filter(|(count, _)| *count > 0)
        .map(|(count, value)| (*count, *value))
        .collect();
    let added: Vec<(i64, &Value)> = counts
        .values()
        .filter(|(count, _)| *count < 0)
        .map(|(count, value)| (-*count, *value))
        .collect();

    if let ([(1, removed)], [(1, added)]) = (removed.as_slice(), added.as_slice()) {
        let containers = matches!(
            (removed, added),
            (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
        );
        if containers {
            diff_values(&element_path, removed, added, entries);
            return;
        }
    }

    for (kind, items) in [(DiffKind::Removed, removed), (DiffKind::Added, added)] {
        for (count, value) in items {
            let mut detail = snippet(value);
            if count > 1 {
                detail.push_str(&format!(" (x{count})"));
            }
            entries.push(DiffEntry {
                kind,
                path: element_path.clone(),
                detail,
            });
        }
    }
}

fn child_path(path: &str, key: &str) -> String {
    let simple = key
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if simple {
        format!("{path}.{key}")
    } else {
        format!("{path}[{}]", Value::String(key.to_string()))
    }
}

fn snippet(value: &Value) -> String {
    truncate_chars(&value.to_string(), VALUE_SNIPPET_CHARS)
}

/// One line per entry; long diffs end with a count of what was left out.
pub fn render_diff(entries: &[DiffEntry]) -> String {
    let mut lines: Vec<String> = entries
        .iter()
        .take(MAX_RENDERED_ENTRIES)
        .map(ToString::to_string)
        .collect();
    if entries.len() > MAX_RENDERED_ENTRIES {
        lines.push(format!(
            "... {} more differences",
            entries.len() - MAX_RENDERED_ENTRIES
        ));
    }
    lines.join("\n")
}
