//! Text quality gate: decide whether extracted page text is usable.
//!
//! Text layers of scanned course notes are often garbage: a watermark
//! repeated on every line, a header loop, or a handful of characters where a
//! full page should be. The gate flags such pages so the caller can replace
//! them with OCR output. It only classifies; it never invokes OCR itself.
//!
//! Three checks, any one of which marks the text as junk:
//!
//! 1. trimmed length below `min_len` characters
//! 2. the most frequent non-blank line is more than `dup_thresh` of all
//!    non-blank lines (repeated headers, footers, OCR noise loops)
//! 3. distinct tokens / total tokens below `min_unique_ratio`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;

/// Thresholds for [`is_junk`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum trimmed length in characters. Default: 50.
    pub min_len: usize,
    /// Maximum share of the most repeated line. Default: 0.25.
    pub dup_thresh: f64,
    /// Minimum distinct-token ratio. Default: 0.30.
    pub min_unique_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_len: 50,
            dup_thresh: 0.25,
            min_unique_ratio: 0.30,
        }
    }
}

/// Why a block of text was classified as junk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JunkReason {
    /// Fewer than `min_len` characters after trimming.
    TooShort { len: usize },
    /// One line makes up `share` of all non-blank lines.
    RepeatedLines { share: f64 },
    /// Only `ratio` of the tokens are distinct.
    LowDiversity { ratio: f64 },
}

impl QualityThresholds {
    /// Classify `text`, returning the first check it fails.
    pub fn classify(&self, text: &str) -> Option<JunkReason> {
        let len = text.trim().chars().count();
        if len < self.min_len {
            return Some(JunkReason::TooShort { len });
        }

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if !lines.is_empty() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for line in &lines {
                *counts.entry(line).or_default() += 1;
            }
            let most_common = counts.values().copied().max().unwrap_or(0);
            let share = most_common as f64 / lines.len() as f64;
            if share > self.dup_thresh {
                return Some(JunkReason::RepeatedLines { share });
            }
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let distinct: HashSet<&str> = tokens.iter().copied().collect();
        let ratio = distinct.len() as f64 / tokens.len().max(1) as f64;
        if ratio < self.min_unique_ratio {
            return Some(JunkReason::LowDiversity { ratio });
        }

        None
    }

    /// True when `text` fails any of the three checks.
    pub fn is_junk(&self, text: &str) -> bool {
        self.classify(text).is_some()
    }
}

/// Classify `text` with the given length and duplication thresholds and the
/// default diversity threshold.
pub fn is_junk(text: &str, min_len: usize, dup_thresh: f64) -> bool {
    QualityThresholds {
        min_len,
        dup_thresh,
        ..QualityThresholds::default()
    }
    .is_junk(text)
}
