//! OCR fallback for pages whose text layer fails the quality gate.
//!
//! [`OcrEngine`] is the seam [`crate::document::extract_text`] calls through.
//! [`VisionOcr`] renders the page with pdfium and asks a vision-capable
//! `edgequake-llm` provider to transcribe it; [`NoOcr`] is for callers (and
//! tests) that want the extracted text layer only.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::{encode, render};
use crate::prompts::OCR_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Transcribes a single PDF page.
pub trait OcrEngine: Send + Sync {
    /// Text of page `page_number` (1-indexed) of the PDF at `pdf_path`.
    fn ocr_page(
        &self,
        pdf_path: &Path,
        page_number: usize,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

/// An engine that never transcribes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    async fn ocr_page(
        &self,
        _pdf_path: &Path,
        _page_number: usize,
    ) -> Result<String, ExtractError> {
        Err(ExtractError::OcrUnavailable)
    }
}

/// OCR through a vision model.
#[derive(Clone)]
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    max_pixels: u32,
    max_tokens: usize,
}

impl std::fmt::Debug for VisionOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionOcr")
            .field("max_pixels", &self.max_pixels)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            max_pixels: config.ocr_max_pixels,
            max_tokens: config.ocr_max_tokens,
        }
    }
}

impl OcrEngine for VisionOcr {
    async fn ocr_page(&self, pdf_path: &Path, page_number: usize) -> Result<String, ExtractError> {
        let start = Instant::now();
        let image = render::render_page(pdf_path, page_number, self.max_pixels).await?;
        let image_data = encode::encode_page(&image, page_number)?;

        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::Transport {
                detail: e.to_string(),
            })?;

        debug!(
            "OCR page {}: {} input tokens, {} output tokens, {:?}",
            page_number,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(tidy_transcription(&response.content))
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

/// Strip an outer code fence and invisible characters from model output.
pub fn tidy_transcription(input: &str) -> String {
    let trimmed = input.trim();
    let body = RE_OUTER_FENCES
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());
    body.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fence_with_language() {
        assert_eq!(tidy_transcription("```text\nUNIT I\nSets\n```"), "UNIT I\nSets");
        assert_eq!(tidy_transcription("```\nplain\n```\n"), "plain");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(tidy_transcription("  Ohm's law\u{200B}  "), "Ohm's law");
    }

    #[tokio::test]
    async fn no_ocr_is_unavailable() {
        let err = NoOcr.ocr_page(Path::new("x.pdf"), 1).await.unwrap_err();
        assert_eq!(err, ExtractError::OcrUnavailable);
    }
}
