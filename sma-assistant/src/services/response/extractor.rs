//! Pull a JSON object out of free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Field name to raw value, as found in the model output.
pub type JsonObject = Map<String, Value>;

/// How many characters of unparseable text to include in the warning.
const LOG_PREVIEW_CHARS: usize = 200;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\s*\n(.*?)\n```").expect("fenced json pattern is valid")
});

static FENCED_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\s*\n(.*?)\n```").expect("fenced block pattern is valid"));

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]*)`").expect("inline code pattern is valid"));

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Every pattern is tried in priority order; within one pattern, matches are
/// tried in document order.
fn from_code_spans(text: &str) -> Option<JsonObject> {
    [&*FENCED_JSON, &*FENCED_ANY, &*INLINE_CODE]
        .into_iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_object(m.as_str()))
}

/// Parse the span from the first `{` to the last `}`.
fn from_brace_span(text: &str) -> Option<JsonObject> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end])
}

/// Extract a JSON object from raw model output.
///
/// Tries, in order: ```` ```json ```` fenced blocks, untagged fenced blocks,
/// inline backtick spans, the whole text, and finally the outermost brace
/// span. Returns `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<JsonObject> {
    let text = text.trim();
    if text.is_empty() {
        tracing::warn!("Empty text provided for JSON extraction");
        return None;
    }

    let found = from_code_spans(text)
        .or_else(|| parse_object(text))
        .or_else(|| from_brace_span(text));

    if found.is_none() {
        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        tracing::warn!(preview = %preview, "Could not extract valid JSON from text");
    }

    found
}
