//! Cell value parsing and `{param}` placeholder handling.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use recon_core::clean_text;
use regex::{Captures, Regex};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\s*([^{}\s][^{}]*?)\s*\}").expect("placeholder regex is valid")
    })
}

fn unresolved_regex() -> &'static Regex {
    static UNRESOLVED: OnceLock<Regex> = OnceLock::new();
    UNRESOLVED.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("unresolved regex is valid"))
}

/// Lowercases and drops whitespace, `_` and `-` so header lookups tolerate formatting noise.
pub fn normalize_column_name(raw: &str) -> String {
    clean_text(raw)
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True for empty, whitespace-only, or exported-NaN cells.
pub fn is_blank_cell(raw: &str) -> bool {
    let cleaned = clean_text(raw);
    cleaned.is_empty()
        || cleaned.eq_ignore_ascii_case("nan")
        || cleaned.eq_ignore_ascii_case("none")
}

/// Splits a cell on commas and line breaks into trimmed literal values.
///
/// Duplicates are kept in order.
pub fn parse_cell_values(raw: &str) -> Vec<String> {
    if is_blank_cell(raw) {
        return Vec::new();
    }
    raw.split([',', '\n', '\r'])
        .map(clean_text)
        .filter(|value| !value.is_empty())
        .collect()
}

/// Placeholder names in first-appearance order, each listed once.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in placeholder_regex().captures_iter(template) {
        let name = captures[1].trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Replaces each `{name}` (whitespace inside the braces allowed) with its value.
/// Unknown names are left in place.
pub fn substitute_placeholders(template: &str, values: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |captures: &Captures<'_>| {
            let name = captures[1].trim();
            match values.get(name) {
                Some(value) => value.clone(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// True when any `{...}` token survives substitution.
pub fn has_unresolved_placeholder(resolved: &str) -> bool {
    unresolved_regex().is_match(resolved)
}
