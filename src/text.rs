//! String helpers shared by the pipeline and the query engine.

use std::sync::LazyLock;

use regex::Regex;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());
static CREDIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*CTTO:.*$").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const ELLIPSIS: &str = "...";

/// Force the secure scheme: schemeless input gets `https://`, `http://` is upgraded.
pub fn secure_url(raw: &str) -> String {
    let url = raw.trim();
    if url.is_empty() {
        return String::new();
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("https://") {
        url.to_string()
    } else if lower.starts_with("http://") {
        format!("https://{}", &url["http://".len()..])
    } else {
        format!("https://{}", url.trim_start_matches("//"))
    }
}

/// Dedup key for a URL: lowercased, one trailing slash removed.
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    match lower.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Drop citation markers and photo credits, collapse whitespace, capitalise.
pub fn clean_description(raw: &str) -> String {
    let without_refs = CITATION_RE.replace_all(raw, "");
    let without_credit = CREDIT_RE.replace(&without_refs, "");
    let collapsed = SPACE_RE.replace_all(&without_credit, " ");
    capitalize_first(collapsed.trim())
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cap a description at `cap` characters; longer text keeps `cap - 3` characters
/// plus an ellipsis. Returns whether truncation happened.
pub fn truncate_description(desc: &str, cap: usize) -> (String, bool) {
    if desc.chars().count() <= cap {
        return (desc.to_string(), false);
    }
    let keep = cap.saturating_sub(ELLIPSIS.len());
    let mut out: String = desc.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    (out, true)
}

/// Remove stray quote characters picked up from hand-edited spreadsheets.
pub fn sanitize_name(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\u{201C}' | '\u{201D}'))
        .collect();
    let collapsed = SPACE_RE.replace_all(stripped.trim(), " ");
    collapsed
        .trim_matches(|c: char| c == '\'' || c.is_whitespace())
        .to_string()
}

/// Identity key for display-time dedup across pools.
pub fn normalize_name(raw: &str) -> String {
    sanitize_name(raw).to_lowercase()
}

/// Expand the semicolon-joined tag string into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn contains_any(haystack_lower: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack_lower.contains(n.as_str()))
}
