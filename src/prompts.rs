//! Prompts for every model call the pipeline makes.
//!
//! Centralising prompts here keeps them inspectable from unit tests and
//! keeps wording changes out of the orchestrator. Each builder is a pure
//! function of its inputs: the same context and count always yield the same
//! prompt.
//!
//! The generation prompts share one output contract with the recovery
//! engine: a single JSON object holding a named array (`"flashcards"`,
//! `"mcqs"`, `"units"`), and no Markdown code fences.

use crate::output::SyllabusUnit;

/// Closing instruction shared by the flashcard and MCQ prompts.
pub const NO_FENCES: &str =
    "Do not include any Markdown formatting (no ```json blocks). Just the raw JSON.";

/// Prompt asking for exactly `count` flashcards about `context`.
pub fn flashcard_prompt(student_info: &str, context: &str, count: usize) -> String {
    format!(
        r#"You are an expert tutor.
Create exactly {count} flashcards based on the provided text.

Output Format:
Return a single valid JSON object.
The object must have a key "flashcards" containing an array.
Each item in the array must be an object with "front" and "back" keys.

Example:
{{
  "flashcards": [
    {{"front": "Question 1", "back": "Answer 1"}},
    {{"front": "Question 2", "back": "Answer 2"}}
  ]
}}

Student Info: {student_info}
Context:
{context}

{NO_FENCES}
"#
    )
}

/// Prompt asking for exactly `count` multiple-choice questions.
pub fn mcq_prompt(student_info: &str, context: &str, count: usize) -> String {
    format!(
        r#"You are an expert exam creator.
Create exactly {count} multiple choice questions (MCQs) based on the text.

Output Format:
Return a single valid JSON object.
The object must have a key "mcqs" containing an array.
Each item in the array must be an object with:
- "question": string
- "options": array of 4 strings
- "correct_option": string (must be "A", "B", "C", or "D")

Example:
{{
  "mcqs": [
    {{
      "question": "What is 2+2?",
      "options": ["3", "4", "5", "6"],
      "correct_option": "B"
    }}
  ]
}}

Student Info: {student_info}
Context:
{context}

{NO_FENCES}
"#
    )
}

/// Prompt structuring raw syllabus text into units, topics and subtopics.
pub fn syllabus_prompt(syllabus_text: &str) -> String {
    format!(
        r#"You are an academic curriculum coordinator.
Given the extracted text from a course syllabus PDF, your task is to organize it into a structured JSON format.

The structure must follow this format:
{{
  "units": [
    {{
      "unitName": "Unit I: [Name]",
      "topics": [
        {{
          "topicName": "[Main Topic Title]",
          "subtopics": ["Optional subtopic 1", "Optional subtopic 2"]
        }}
      ]
    }}
  ]
}}

Rules:
- Identify clear "Units" or "Modules" (usually numbered I, II, III ... or 1, 2, 3 ...).
- Under each Unit, identify the main topics.
- If a topic has clear bullet points or sub-items, list them as "subtopics".
- Output ONLY valid JSON. No conversational text.
- If no subtopics are found, leave the array empty [].

Syllabus Text:
"""{syllabus_text}"""

Output JSON:
"#
    )
}

/// Compact outline of a syllabus: one `- unit` line per unit followed by
/// `  * topic` lines.
pub fn syllabus_summary(units: &[SyllabusUnit]) -> String {
    units
        .iter()
        .map(|unit| {
            let mut block = format!("- {}\n", unit.unit_name);
            for topic in &unit.topics {
                block.push_str(&format!("  * {}\n", topic.topic_name));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt placing one chunk excerpt within a syllabus outline.
///
/// `excerpt` should already be truncated by the caller.
pub fn tagging_prompt(summary: &str, excerpt: &str) -> String {
    format!(
        r#"Categorize the following text chunk into the correct Unit and Topic from the provided syllabus.

Syllabus Structure:
{summary}

Text Chunk:
"""{excerpt}..."""

Output ONLY valid JSON with keys: "unit", "topic", "subtopic".
If it belongs to multiple or none, choose the best fit or "General".
"#
    )
}

/// System prompt for transcribing a rendered page image.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe all text visible in the page image.

Rules:
- Preserve the reading order a human would follow
- Keep headings, numbered items and bullet points on their own lines
- Transcribe tables row by row, separating cells with " | "
- Ignore page numbers, decorative borders and watermarks
- Output ONLY the transcribed text, with no commentary and no code fences"#;
