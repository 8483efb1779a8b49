//! Artifact types produced by the extraction pipeline.
//!
//! Every type here is created fresh by a validator and handed to the caller
//! as an immutable collection. Field names on the wire follow the JSON the
//! model is asked to produce (`unitName`, `topicName`, `correct_option`), so
//! the serialised form can be fed straight back to a frontend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One question/answer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Letter of the correct MCQ option; `A` is position 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectOption {
    A,
    B,
    C,
    D,
}

impl CorrectOption {
    /// Letters in option order.
    pub const ALL: [CorrectOption; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Zero-based option position.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    /// Letter for a zero-based position, if it is within A–D.
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Parse a single letter, case-insensitively.
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for CorrectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multiple-choice question with 2–4 options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: CorrectOption,
}

impl Mcq {
    /// Text of the option `correct_option` points at.
    pub fn correct_text(&self) -> &str {
        // Validators only build MCQs whose letter indexes a real option.
        self.options
            .get(self.correct_option.index())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// A syllabus topic and its (possibly empty) subtopics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "topicName")]
    pub topic_name: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

/// One unit (module) of a syllabus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusUnit {
    #[serde(rename = "unitName")]
    pub unit_name: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// Label used when a chunk cannot be placed in the syllabus.
pub const GENERAL: &str = "General";

/// Syllabus position assigned to a text chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTag {
    pub unit: String,
    pub topic: String,
    pub subtopic: String,
}

impl Default for ChunkTag {
    fn default() -> Self {
        Self {
            unit: GENERAL.to_string(),
            topic: GENERAL.to_string(),
            subtopic: String::new(),
        }
    }
}

impl ChunkTag {
    /// True when the chunk was not placed anywhere specific.
    pub fn is_general(&self) -> bool {
        self.unit == GENERAL && self.topic == GENERAL && self.subtopic.is_empty()
    }
}
