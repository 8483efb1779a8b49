//! Context input: the source text a prompt is built around.
//!
//! Callers hand over whatever they have (a plain string, a retrieved
//! document, or a list of either) and [`ContextInput::normalise`] flattens
//! it into one bounded string. Truncation happens on a character boundary,
//! never by erroring, so an oversized retrieval result still yields a usable
//! prompt.

use serde::{Deserialize, Serialize};

/// Separator placed between members of a [`ContextInput::Sequence`].
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Heterogeneous context input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextInput {
    /// Plain text.
    Text(String),
    /// A retrieved document; only its text is used. Vector-store documents
    /// carry it as `page_content`.
    Document {
        #[serde(alias = "page_content")]
        text: String,
    },
    /// Several inputs, joined with a blank line.
    Sequence(Vec<ContextInput>),
}

impl ContextInput {
    /// Wrap a document's text.
    pub fn document(text: impl Into<String>) -> Self {
        Self::Document { text: text.into() }
    }

    /// Flatten into one string of at most `max_chars` characters.
    pub fn normalise(&self, max_chars: usize) -> String {
        let mut out = String::new();
        self.flatten_into(&mut out);
        truncate_chars(&out, max_chars).to_string()
    }

    fn flatten_into(&self, out: &mut String) {
        match self {
            Self::Text(text) | Self::Document { text } => out.push_str(text),
            Self::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(CONTEXT_SEPARATOR);
                    }
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl From<&str> for ContextInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ContextInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<ContextInput>> From<Vec<T>> for ContextInput {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
