//! JSON recovery: turn free-form model output into a parsed JSON value.
//!
//! Models asked for "only JSON" still prepend "Sure! Here you go:", append
//! "hope that helps", leave trailing commas, and embed raw control
//! characters in strings. This module locates the most plausible JSON span,
//! repairs the common syntax defects, and parses it, falling back through a
//! fixed cascade before giving up with [`ExtractError::Recovery`].
//!
//! ## Cascade
//!
//! 1. [`repair_json_string`]: greedy array span (first `[` … last `]`), else
//!    greedy object span (first `{` … last `}`), else the whole text; control
//!    characters become spaces; trailing commas before `]`/`}` are removed.
//! 2. On parse failure, the *original* text's greedy array span, then its
//!    greedy object span, parsed as-is.
//! 3. Balanced spans found by depth counting (aware of string literals), in
//!    order of their opening bracket. This rescues output such as
//!    `[1] or maybe [2]` where the greedy span is not valid JSON.
//!
//! Single-object replies (chunk tags) go through [`recover_json_object`],
//! which tries the object readings before this cascade.
//!
//! Greedy spans deliberately capture the *largest* bracketed region: with
//! model output the surrounding prose is the unreliable part, not the JSON.

use crate::error::{snippet, ExtractError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static RE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static RE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

static RE_CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F]").unwrap());

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\]}])").unwrap());

/// Characters of raw output kept in a [`ExtractError::Recovery`] snippet.
const SNIPPET_CHARS: usize = 200;

/// Extract the candidate JSON span from `raw` and repair common defects.
pub fn repair_json_string(raw: &str) -> String {
    let candidate = greedy_array(raw)
        .or_else(|| greedy_object(raw))
        .unwrap_or(raw);
    repair_span(candidate)
}

/// Recover a JSON value from raw model output.
pub fn recover_json(raw: &str) -> Result<Value, ExtractError> {
    let repaired = repair_json_string(raw);
    let first_err = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    debug!("Repaired candidate did not parse ({first_err}); trying fallbacks");

    let fallbacks = greedy_array(raw)
        .into_iter()
        .chain(greedy_object(raw))
        .chain(balanced_spans(raw));
    for span in fallbacks {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            debug!("Recovered JSON from fallback span of {} bytes", span.len());
            return Ok(value);
        }
    }

    Err(ExtractError::Recovery {
        detail: first_err.to_string(),
        snippet: snippet(raw, SNIPPET_CHARS),
    })
}

/// Recover a JSON object from raw model output.
///
/// For replies that are a single object (chunk tags). The whole trimmed text
/// is tried first, then the greedy object span (repaired, then as-is), and
/// only then the array-first cascade of [`recover_json`]. An array nested
/// in the object therefore never replaces it.
pub fn recover_json_object(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = raw.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    if let Some(span) = greedy_object(raw) {
        let repaired = repair_span(span);
        for candidate in [repaired.as_str(), span] {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                debug!("Recovered object span of {} bytes", candidate.len());
                return Ok(value);
            }
        }
    }
    recover_json(raw)
}

fn repair_span(span: &str) -> String {
    let without_control = RE_CONTROL.replace_all(span, " ");
    RE_TRAILING_COMMA
        .replace_all(&without_control, "$1")
        .trim()
        .to_string()
}

fn greedy_array(raw: &str) -> Option<&str> {
    RE_ARRAY.find(raw).map(|m| m.as_str())
}

fn greedy_object(raw: &str) -> Option<&str> {
    RE_OBJECT.find(raw).map(|m| m.as_str())
}

/// Balanced `[..]` / `{..}` spans, one per opening bracket that closes.
///
/// Brackets inside JSON string literals are ignored. Spans are yielded in
/// order of their opening bracket, so an outer span precedes the spans nested
/// in it.
fn balanced_spans(raw: &str) -> impl Iterator<Item = &str> {
    raw.char_indices()
        .filter(|&(_, c)| c == '[' || c == '{')
        .filter_map(move |(start, _)| {
            balanced_end(&raw[start..]).map(|len| &raw[start..start + len])
        })
}

/// Byte length of the balanced span opening at the start of `s`.
fn balanced_end(s: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_prose_and_trailing_comma() {
        let raw = "Sure! Here you go: [{\"a\":1},{\"a\":2},]  -- hope that helps";
        assert_eq!(repair_json_string(raw), "[{\"a\":1},{\"a\":2}]");
        assert_eq!(recover_json(raw).unwrap(), json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn object_wrapper_is_kept_when_no_array_span() {
        let raw = "Result: {\"ok\": true,}";
        assert_eq!(recover_json(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn array_span_wins_inside_object() {
        // The greedy array span is preferred even when an object wraps it.
        let raw = r#"{"flashcards": [{"front": "Q", "back": "A"}]}"#;
        assert_eq!(
            repair_json_string(raw),
            r#"[{"front": "Q", "back": "A"}]"#
        );
    }

    #[test]
    fn control_characters_become_spaces() {
        let raw = "[\"line\u{0001}one\"]";
        assert_eq!(recover_json(raw).unwrap(), json!(["line one"]));
    }

    #[test]
    fn falls_back_to_original_object_span() {
        // The array span `[broken` … `]` fails; the original object parses.
        let raw = r#"{"note": "see [1", "cards": "x]"}"#;
        assert_eq!(
            recover_json(raw).unwrap(),
            json!({"note": "see [1", "cards": "x]"})
        );
    }

    #[test]
    fn balanced_scan_rescues_multiple_arrays() {
        let raw = "Option one: [1, 2] or option two: [3]";
        assert_eq!(recover_json(raw).unwrap(), json!([1, 2]));
    }

    #[test]
    fn balanced_scan_ignores_brackets_in_strings() {
        assert_eq!(balanced_end(r#"["a]b", 1] tail"#), Some(10));
        assert_eq!(balanced_end("[1, {2]"), None);
    }

    #[test]
    fn garbage_is_a_recovery_error() {
        let err = recover_json("I'm sorry, I can't help with that.").unwrap_err();
        match err {
            ExtractError::Recovery { snippet, .. } => assert!(snippet.starts_with("I'm sorry")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_output_is_a_recovery_error() {
        assert!(matches!(
            recover_json(""),
            Err(ExtractError::Recovery { .. })
        ));
    }

    #[test]
    fn object_recovery_keeps_object_with_nested_arrays() {
        let raw = r#"{"unit": "Unit I: Graphs", "topic": "Shortest paths", "subtopic": []}"#;
        assert_eq!(recover_json(raw).unwrap(), json!([]));
        assert_eq!(
            recover_json_object(raw).unwrap(),
            json!({"unit": "Unit I: Graphs", "topic": "Shortest paths", "subtopic": []})
        );
    }

    #[test]
    fn object_recovery_repairs_chatty_object() {
        let raw = "Here is the tag:\n{\"unit\": \"II\", \"subtopic\": [\"BFS\"],}\nThanks";
        assert_eq!(
            recover_json_object(raw).unwrap(),
            json!({"unit": "II", "subtopic": ["BFS"]})
        );
    }

    #[test]
    fn object_recovery_falls_back_to_cascade() {
        assert_eq!(recover_json_object("tags: [1, 2]").unwrap(), json!([1, 2]));
        assert!(matches!(
            recover_json_object("nothing"),
            Err(ExtractError::Recovery { .. })
        ));
    }

    #[test]
    fn recovery_is_idempotent_on_valid_flashcards() {
        let raw = r#"[{"front": "Q1", "back": "A1"}, {"front": "Q2", "back": "A2"}]"#;
        let once = recover_json(raw).unwrap();
        let twice = recover_json(&repair_json_string(&repair_json_string(raw))).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, serde_json::from_str::<Value>(raw).unwrap());
    }
}
