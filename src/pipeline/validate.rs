//! Schema validation: map a loosely-typed JSON value onto artifact types.
//!
//! Recovery yields *some* JSON; this module decides what it means. Each
//! validator first resolves the collection to validate (the model may answer
//! with a bare array, an object wrapping an array under any key, or an
//! object with several arrays), then checks entries one by one. A defective
//! entry is dropped and the rest are kept, so a batch degrades gracefully
//! instead of failing as a whole.
//!
//! Field names are looked up through explicit, ordered accessor lists (see
//! [`FLASHCARD_FRONT`] and friends) applied by [`first_text`], rather than
//! string-literal fallbacks scattered through the validators.

use crate::error::ExtractError;
use crate::output::{ChunkTag, CorrectOption, Flashcard, Mcq, SyllabusUnit, Topic};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

// ── Accessor lists ───────────────────────────────────────────────────────────

pub const FLASHCARD_FRONT: &[&str] = &["front", "question", "term", "Front"];
pub const FLASHCARD_BACK: &[&str] = &["back", "answer", "definition", "Back"];

pub const MCQ_QUESTION: &[&str] = &["question", "Question"];
pub const MCQ_OPTIONS: &[&str] = &["options", "Options", "choices"];
pub const MCQ_CORRECT: &[&str] = &["correct_option", "answer", "Correct", "correct"];

pub const UNIT_NAME: &[&str] = &["unitName", "unit_name", "unit", "name", "title"];
pub const UNIT_TOPICS: &[&str] = &["topics", "Topics"];
pub const TOPIC_NAME: &[&str] = &["topicName", "topic_name", "topic", "name", "title"];
pub const TOPIC_SUBTOPICS: &[&str] = &["subtopics", "Subtopics", "sub_topics"];

pub const TAG_UNIT: &[&str] = &["unit", "Unit", "unitName"];
pub const TAG_TOPIC: &[&str] = &["topic", "Topic", "topicName"];
pub const TAG_SUBTOPIC: &[&str] = &["subtopic", "Subtopic", "sub_topic"];

/// MCQs keep at most this many options.
pub const MAX_OPTIONS: usize = 4;

/// MCQs need at least this many options.
pub const MIN_OPTIONS: usize = 2;

// ── Shape resolution ─────────────────────────────────────────────────────────

/// How to find an artifact collection inside an arbitrary JSON value.
#[derive(Debug, Clone, Copy)]
pub struct CollectionShape {
    /// Keys whose presence in a list's first element marks the right list.
    pub content_keys: &'static [&'static str],
    /// Conventional wrapper keys tried when no list matches by content.
    pub wrapper_keys: &'static [&'static str],
}

pub const FLASHCARD_SHAPE: CollectionShape = CollectionShape {
    content_keys: &["front", "term"],
    wrapper_keys: &["flashcards", "cards"],
};

pub const MCQ_SHAPE: CollectionShape = CollectionShape {
    content_keys: &["question", "Question"],
    wrapper_keys: &["mcqs", "questions"],
};

pub const SYLLABUS_SHAPE: CollectionShape = CollectionShape {
    content_keys: &["unitName", "topics"],
    wrapper_keys: &["units"],
};

/// Locate the collection to validate.
///
/// - a sequence is used directly;
/// - in a mapping, the first value (insertion order) that is a sequence whose
///   first element is a mapping holding one of `content_keys`; failing that,
///   the first `wrapper_keys` entry holding a sequence;
/// - anything else is a [`ExtractError::Shape`] failure.
pub fn resolve_collection<'a>(
    value: &'a Value,
    shape: &CollectionShape,
) -> Result<&'a [Value], ExtractError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            let by_content = map.values().find_map(|v| match v {
                Value::Array(items) if first_has_key(items, shape.content_keys) => {
                    Some(items.as_slice())
                }
                _ => None,
            });
            by_content
                .or_else(|| {
                    shape
                        .wrapper_keys
                        .iter()
                        .find_map(|k| map.get(*k).and_then(Value::as_array))
                        .map(Vec::as_slice)
                })
                .ok_or_else(|| ExtractError::Shape {
                    found: format!("object with keys {:?}", map.keys().collect::<Vec<_>>()),
                })
        }
        other => Err(ExtractError::Shape {
            found: json_kind(other).to_string(),
        }),
    }
}

fn first_has_key(items: &[Value], keys: &[&str]) -> bool {
    items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|obj| keys.iter().any(|k| obj.contains_key(*k)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Flexible key lookup ──────────────────────────────────────────────────────

/// Render a scalar JSON value as trimmed text.
///
/// Strings are trimmed, numbers and booleans rendered; null, arrays and
/// objects have no text form.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First key in `keys` whose value renders to non-empty text.
pub fn first_text(entry: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| entry.get(*k))
        .filter_map(scalar_text)
        .find(|s| !s.is_empty())
}

/// The value of the first key in `keys` that is present, if it is an array.
///
/// A present non-array value wins over later keys and yields `None`.
fn first_array<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .find_map(|k| entry.get(*k))
        .and_then(Value::as_array)
}

// ── Flashcards ───────────────────────────────────────────────────────────────

/// Validate a parsed value as a flashcard batch.
pub fn validate_flashcards(value: &Value) -> Result<Vec<Flashcard>, ExtractError> {
    let items = resolve_collection(value, &FLASHCARD_SHAPE)?;
    let mut seen = HashSet::new();
    let cards: Vec<Flashcard> = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            Some(Flashcard {
                front: first_text(entry, FLASHCARD_FRONT)?,
                back: first_text(entry, FLASHCARD_BACK)?,
            })
        })
        .filter(|card| seen.insert(card.front.clone()))
        .collect();
    debug!("Flashcards: kept {}/{} entries", cards.len(), items.len());
    Ok(cards)
}

// ── MCQs ─────────────────────────────────────────────────────────────────────

/// Validate a parsed value as an MCQ batch.
pub fn validate_mcqs(value: &Value) -> Result<Vec<Mcq>, ExtractError> {
    let items = resolve_collection(value, &MCQ_SHAPE)?;
    let mut seen = HashSet::new();
    let mcqs: Vec<Mcq> = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(validate_mcq)
        .filter(|mcq| seen.insert(mcq.question.clone()))
        .collect();
    debug!("MCQs: kept {}/{} entries", mcqs.len(), items.len());
    Ok(mcqs)
}

fn validate_mcq(entry: &Map<String, Value>) -> Option<Mcq> {
    let question = first_text(entry, MCQ_QUESTION)?;
    let raw_options = first_array(entry, MCQ_OPTIONS)?;
    if raw_options.len() < MIN_OPTIONS {
        return None;
    }
    let options: Vec<String> = raw_options
        .iter()
        .take(MAX_OPTIONS)
        .map(option_text)
        .collect();
    let indicator = first_text(entry, MCQ_CORRECT)?;
    let correct_option = resolve_correct_option(&indicator, &options)?;
    Some(Mcq {
        question,
        options,
        correct_option,
    })
}

fn option_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_else(|| value.to_string())
}

/// Resolve an answer indicator against the (truncated) options.
///
/// Tried in order: a single letter A–D, a digit 0–3, then a
/// case-insensitive exact match against the option texts. The resolved
/// letter must point at an option that exists.
pub fn resolve_correct_option(indicator: &str, options: &[String]) -> Option<CorrectOption> {
    let indicator = indicator.trim();
    let mut chars = indicator.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    };

    let resolved = single
        .and_then(CorrectOption::from_letter)
        .or_else(|| {
            single
                .and_then(|c| c.to_digit(10))
                .and_then(|d| CorrectOption::from_index(d as usize))
        })
        .or_else(|| {
            let wanted = indicator.to_lowercase();
            options
                .iter()
                .position(|opt| opt.to_lowercase() == wanted)
                .and_then(CorrectOption::from_index)
        })?;

    (resolved.index() < options.len()).then_some(resolved)
}

// ── Syllabus ─────────────────────────────────────────────────────────────────

/// Validate a parsed value as a syllabus unit tree.
///
/// Only structure is checked; duplicate unit or topic names are kept.
pub fn validate_syllabus(value: &Value) -> Result<Vec<SyllabusUnit>, ExtractError> {
    let items = resolve_collection(value, &SYLLABUS_SHAPE)?;
    let units: Vec<SyllabusUnit> = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            Some(SyllabusUnit {
                unit_name: first_text(entry, UNIT_NAME)?,
                topics: first_array(entry, UNIT_TOPICS)
                    .map(|topics| topics.iter().filter_map(validate_topic).collect())
                    .unwrap_or_default(),
            })
        })
        .collect();
    debug!("Syllabus: kept {}/{} units", units.len(), items.len());
    Ok(units)
}

fn validate_topic(value: &Value) -> Option<Topic> {
    match value {
        Value::Object(entry) => Some(Topic {
            topic_name: first_text(entry, TOPIC_NAME)?,
            subtopics: first_array(entry, TOPIC_SUBTOPICS)
                .map(|subs| {
                    subs.iter()
                        .filter_map(scalar_text)
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }),
        other => scalar_text(other)
            .filter(|s| !s.is_empty())
            .map(|topic_name| Topic {
                topic_name,
                subtopics: Vec::new(),
            }),
    }
}

// ── Chunk tags ───────────────────────────────────────────────────────────────

/// Read a chunk tag; absent fields fall back to the general tag.
pub fn validate_chunk_tag(value: &Value) -> ChunkTag {
    let default = ChunkTag::default();
    let Some(entry) = value.as_object() else {
        return default;
    };
    ChunkTag {
        unit: first_text(entry, TAG_UNIT).unwrap_or(default.unit),
        topic: first_text(entry, TAG_TOPIC).unwrap_or(default.topic),
        subtopic: first_text(entry, TAG_SUBTOPIC).unwrap_or(default.subtopic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Shape ────────────────────────────────────────────────────────────

    #[test]
    fn object_is_scanned_by_content_before_wrapper_keys() {
        let v = json!({
            "cards": [{"front": "wrapper", "back": "x"}],
            "generated": [{"term": "content", "definition": "y"}],
        });
        // "cards" is first in insertion order and also matches by content.
        let items = resolve_collection(&v, &FLASHCARD_SHAPE).unwrap();
        assert_eq!(items[0]["front"], "wrapper");

        let v = json!({"meta": [1, 2], "flashcards": []});
        let items = resolve_collection(&v, &FLASHCARD_SHAPE).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn unrecognised_shapes_fail() {
        assert!(matches!(
            resolve_collection(&json!("text"), &MCQ_SHAPE),
            Err(ExtractError::Shape { .. })
        ));
        assert!(matches!(
            resolve_collection(&json!({"notes": "none"}), &MCQ_SHAPE),
            Err(ExtractError::Shape { .. })
        ));
    }

    #[test]
    fn first_text_skips_blank_and_non_scalar_values() {
        let v = json!({"front": "  ", "question": ["list"], "term": 42});
        assert_eq!(
            first_text(v.as_object().unwrap(), FLASHCARD_FRONT),
            Some("42".to_string())
        );
    }

    // ── Flashcards ───────────────────────────────────────────────────────

    #[test]
    fn flashcard_dedup_keeps_first() {
        let v = json!([
            {"front": "Q1", "back": "A1"},
            {"front": "Q1", "back": "A2"},
        ]);
        let cards = validate_flashcards(&v).unwrap();
        assert_eq!(
            cards,
            vec![Flashcard {
                front: "Q1".into(),
                back: "A1".into()
            }]
        );
    }

    #[test]
    fn flashcard_with_blank_back_is_dropped() {
        let v = json!([{"front": "Q1", "back": "   "}, {"front": "Q2", "back": "A2"}]);
        let cards = validate_flashcards(&v).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "Q2");
    }

    #[test]
    fn flashcard_alternate_keys_and_trimming() {
        let v = json!({"flashcards": [
            {"term": " Osmosis ", "definition": " Water diffusion "},
            {"Front": "Enzyme", "Back": "Catalyst"},
            "not a card",
            {"front": "Orphan"},
        ]});
        let cards = validate_flashcards(&v).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "Osmosis");
        assert_eq!(cards[0].back, "Water diffusion");
        assert_eq!(cards[1].back, "Catalyst");
    }

    // ── MCQs ─────────────────────────────────────────────────────────────

    #[test]
    fn mcq_options_truncated_and_answer_matched_by_text() {
        let v = json!([{"question": "Q", "options": ["a", "b", "c", "d", "e"], "correct_option": "b"}]);
        let mcqs = validate_mcqs(&v).unwrap();
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].options, vec!["a", "b", "c", "d"]);
        assert_eq!(mcqs[0].correct_option, CorrectOption::B);
    }

    #[test]
    fn mcq_digit_indicator_maps_to_letter() {
        let v = json!([{"question": "Q", "options": ["w", "x", "y", "z"], "correct_option": "2"}]);
        assert_eq!(validate_mcqs(&v).unwrap()[0].correct_option, CorrectOption::C);

        let v = json!([{"question": "Q", "options": ["w", "x", "y", "z"], "answer": 3}]);
        assert_eq!(validate_mcqs(&v).unwrap()[0].correct_option, CorrectOption::D);
    }

    #[test]
    fn mcq_with_single_option_is_dropped() {
        let v = json!([{"question": "Q", "options": ["only"], "correct_option": "A"}]);
        assert!(validate_mcqs(&v).unwrap().is_empty());
    }

    #[test]
    fn mcq_options_key_priority_is_not_skipped() {
        let v = json!([
            {"question": "Q1", "options": "a, b", "choices": ["a", "b"], "correct_option": "A"},
            {"question": "Q2", "choices": ["a", "b"], "correct_option": "B"},
        ]);
        let mcqs = validate_mcqs(&v).unwrap();
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].question, "Q2");
        assert_eq!(mcqs[0].correct_option, CorrectOption::B);
    }

    #[test]
    fn mcq_with_unresolvable_answer_is_dropped() {
        let v = json!([
            {"question": "Q1", "options": ["a", "b", "c", "d"], "correct_option": "e"},
            {"question": "Q2", "options": ["a", "b", "c", "d"]},
            {"question": "Q3", "options": ["a", "b", "c", "d", "e"], "correct_option": "e"},
        ]);
        assert!(validate_mcqs(&v).unwrap().is_empty());
    }

    #[test]
    fn mcq_letter_beyond_options_is_dropped() {
        let v = json!([{"question": "Q", "options": ["yes", "no"], "correct_option": "D"}]);
        assert!(validate_mcqs(&v).unwrap().is_empty());
    }

    #[test]
    fn mcq_lowercase_letter_and_dedup() {
        let v = json!({"mcqs": [
            {"Question": "Capital of France?", "choices": ["Paris", "Rome"], "Correct": "a"},
            {"question": "Capital of France?", "options": ["Rome", "Paris"], "correct": "b"},
        ]});
        let mcqs = validate_mcqs(&v).unwrap();
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].correct_option, CorrectOption::A);
        assert_eq!(mcqs[0].correct_text(), "Paris");
    }

    #[test]
    fn mcq_non_string_options_are_coerced() {
        let v = json!([{"question": "2+2?", "options": [3, 4, 5, 6], "correct_option": "4"}]);
        // "4" is not a digit 0–3, so it matches the option text at position 1.
        let mcqs = validate_mcqs(&v).unwrap();
        assert_eq!(mcqs[0].options, vec!["3", "4", "5", "6"]);
        assert_eq!(mcqs[0].correct_option, CorrectOption::B);
    }

    // ── Syllabus ─────────────────────────────────────────────────────────

    #[test]
    fn syllabus_unit_with_empty_topics() {
        let v = json!({"units": [{"unitName": "I", "topics": []}]});
        let units = validate_syllabus(&v).unwrap();
        assert_eq!(
            units,
            vec![SyllabusUnit {
                unit_name: "I".into(),
                topics: vec![]
            }]
        );
    }

    #[test]
    fn syllabus_accepts_bare_list_and_string_topics() {
        let v = json!([
            {"unitName": "Unit I: Search", "topics": [
                {"topicName": "BFS", "subtopics": ["queues", "", 2]},
                "DFS",
            ]},
            {"unitName": "Unit I: Search"},
            {"topics": []},
        ]);
        let units = validate_syllabus(&v).unwrap();
        assert_eq!(units.len(), 2, "duplicates kept, nameless dropped");
        assert_eq!(units[0].topics[0].subtopics, vec!["queues", "2"]);
        assert_eq!(units[0].topics[1].topic_name, "DFS");
        assert!(units[1].topics.is_empty());
    }

    #[test]
    fn syllabus_from_non_collection_fails_shape() {
        assert!(validate_syllabus(&json!({"syllabus": "n/a"})).is_err());
    }

    // ── Chunk tags ───────────────────────────────────────────────────────

    #[test]
    fn chunk_tag_defaults() {
        let tag = validate_chunk_tag(&json!({"unit": "Unit II", "topic": ""}));
        assert_eq!(tag.unit, "Unit II");
        assert_eq!(tag.topic, "General");
        assert_eq!(tag.subtopic, "");
        assert!(validate_chunk_tag(&json!([1, 2])).is_general());
    }
}
