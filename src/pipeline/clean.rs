//! Text normalisation: deterministic cleanup of extracted page text.
//!
//! Course PDFs downloaded from note-sharing sites carry noise that poisons
//! both retrieval and generation: watermark lines stamped on every page,
//! textbook and reference lists, and words split across lines by
//! hyphenation. [`clean_text`] removes them with a line filter followed by a
//! few whole-text passes.
//!
//! ## Line filter
//!
//! A two-state machine (normal / skipping references):
//!
//! - a bibliography heading ("Text Books:", "References") is dropped and
//!   switches to *skipping*;
//! - while skipping, lines are dropped until one looks like the start of a new
//!   section (an all-caps heading of at least five characters, or a numbered
//!   item such as `1.` or `2)`); that line returns to *normal* and continues
//!   through the remaining filters;
//! - watermark lines and bibliographic field lines (ISBN, Publisher, …) are
//!   dropped wherever they appear.
//!
//! ## Whole-text passes
//!
//! Join hyphenated wraps, normalise line endings, trim trailing whitespace
//! per line, trim the result.

use once_cell::sync::Lazy;
use regex::Regex;

/// Substrings identifying watermark lines.
pub const WATERMARKS: [&str; 2] = ["lOMoARcPSD", "Downloaded by"];

static RE_BIBLIO_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(Text\s*Books?|References?)\s*:?\s*$").unwrap());

static RE_SECTION_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9 ]{5,}$").unwrap());

static RE_NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]").unwrap());

static RE_BIBLIO_FIELDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bISBN\b",
        r"(?i)\bPublisher\b",
        r"(?i)\bEdition\b",
        r"(?i)\bAuthor(s)?\b",
        r"(?i)\bText\s*Book\b",
        r"(?i)\bReference\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Clean one block of extracted text.
///
/// Pure and deterministic; an empty input yields an empty string.
pub fn clean_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let s = normalise_line_endings(input);
    let s = filter_lines(&s);
    let s = join_hyphenated_wraps(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Normal,
    SkippingReferences,
}

fn filter_lines(input: &str) -> String {
    let mut state = LineState::Normal;
    let mut kept: Vec<&str> = Vec::new();

    for raw in input.lines() {
        let line = raw.trim();

        if RE_BIBLIO_HEADING.is_match(line) {
            state = LineState::SkippingReferences;
            continue;
        }
        if state == LineState::SkippingReferences {
            if is_section_start(line) {
                state = LineState::Normal;
            } else {
                continue;
            }
        }
        if is_watermark(line) || is_bibliographic_field(line) {
            continue;
        }
        kept.push(line);
    }

    kept.join("\n")
}

fn is_section_start(line: &str) -> bool {
    RE_SECTION_HEADING.is_match(line) || RE_NUMBERED_ITEM.is_match(line)
}

fn is_watermark(line: &str) -> bool {
    WATERMARKS.iter().any(|w| line.contains(w))
}

fn is_bibliographic_field(line: &str) -> bool {
    RE_BIBLIO_FIELDS.iter().any(|re| re.is_match(line))
}

fn join_hyphenated_wraps(input: &str) -> String {
    input.replace("-\n", "")
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn drops_watermark_lines() {
        let input = "Unit 1 covers sorting\nlOMoARcPSD|123456\nDownloaded by Jane (jane@x.com)\nQuick sort";
        assert_eq!(clean_text(input), "Unit 1 covers sorting\nQuick sort");
    }

    #[test]
    fn skips_reference_block_until_section_start() {
        let input = "Graphs and trees\n\
            TEXT BOOKS:\n\
            Cormen, Introduction to Algorithms\n\
            Sedgewick, Algorithms in C\n\
            UNIT III\n\
            Dynamic programming";
        assert_eq!(
            clean_text(input),
            "Graphs and trees\nUNIT III\nDynamic programming"
        );
    }

    #[test]
    fn numbered_item_ends_reference_block() {
        let input = "References\nKnuth, TAOCP\n2) Hashing basics\nOpen addressing";
        assert_eq!(clean_text(input), "2) Hashing basics\nOpen addressing");
    }

    #[test]
    fn drops_bibliographic_fields_outside_block() {
        let input = "Heaps\nISBN 978-0262033848\nPublisher: MIT Press\n3rd edition, 2009\nBinary heaps";
        assert_eq!(clean_text(input), "Heaps\nBinary heaps");
    }

    #[test]
    fn field_patterns_are_word_bounded() {
        // "Authority" and "referenced" are not bibliographic fields.
        let input = "Certificate Authority\nvalues referenced later";
        assert_eq!(clean_text(input), input);
    }

    #[test]
    fn joins_hyphenated_wraps_and_crlf() {
        let input = "thermo-\r\ndynamics is fun   \r\nsecond line\t";
        assert_eq!(clean_text(input), "thermodynamics is fun\nsecond line");
    }

    #[test]
    fn heading_match_is_whole_line_only() {
        // A sentence mentioning references is not a heading.
        let input = "See the references at the end\nAVL trees";
        assert_eq!(clean_text(input), input);
    }
}
