//! PDF text source: per-page extraction with an OCR fallback.
//!
//! ```text
//! page text ──▶ clean_text ──▶ quality gate ──┬─ usable ──▶ keep
//!                                              └─ junk ────▶ OCR ──▶ clean_text
//! ```
//!
//! Pages are joined with a blank line. A failed OCR call never loses a page:
//! the cleaned text layer is kept and a warning logged.

use crate::error::StudyGenError;
use crate::pipeline::clean::clean_text;
use crate::pipeline::input::validate_pdf_path;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::quality::QualityThresholds;
use crate::pipeline::render;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Separator placed between pages of extracted text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Where the final text of a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// The PDF's own text layer passed the quality gate.
    TextLayer,
    /// The text layer was junk and OCR replaced it.
    Ocr,
    /// The text layer was junk and OCR failed; the text layer was kept.
    TextLayerFallback,
}

/// Cleaned text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    /// 1-indexed.
    pub page_number: usize,
    pub text: String,
    pub source: PageSource,
}

/// Cleaned text of a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    /// All pages joined with [`PAGE_SEPARATOR`].
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Pages whose text layer failed the quality gate.
    pub fn junk_pages(&self) -> impl Iterator<Item = &PageText> {
        self.pages.iter().filter(|p| p.source != PageSource::TextLayer)
    }
}

/// Extract, clean and gate every page of the PDF at `path`.
pub async fn extract_document<O: OcrEngine>(
    path: &Path,
    ocr: &O,
    thresholds: &QualityThresholds,
) -> Result<ExtractedDocument, StudyGenError> {
    let path = validate_pdf_path(path)?;
    let raw_pages = render::extract_page_texts(&path).await?;
    let pages = gate_pages(&path, raw_pages, ocr, thresholds).await;
    info!(
        "Extracted {} pages from {} ({} replaced or flagged by the quality gate)",
        pages.len(),
        path.display(),
        pages.iter().filter(|p| p.source != PageSource::TextLayer).count()
    );
    Ok(ExtractedDocument { pages })
}

/// Extract the cleaned text of the PDF at `path`, pages joined with a blank
/// line.
pub async fn extract_text<O: OcrEngine>(
    path: &Path,
    ocr: &O,
    thresholds: &QualityThresholds,
) -> Result<String, StudyGenError> {
    Ok(extract_document(path, ocr, thresholds).await?.text())
}

/// Clean each raw page and send junk pages through `ocr`.
pub async fn gate_pages<O: OcrEngine>(
    pdf_path: &Path,
    raw_pages: Vec<String>,
    ocr: &O,
    thresholds: &QualityThresholds,
) -> Vec<PageText> {
    let mut pages = Vec::with_capacity(raw_pages.len());
    for (idx, raw) in raw_pages.into_iter().enumerate() {
        let page_number = idx + 1;
        let cleaned = clean_text(&raw);

        let Some(reason) = thresholds.classify(&cleaned) else {
            pages.push(PageText {
                page_number,
                text: cleaned,
                source: PageSource::TextLayer,
            });
            continue;
        };

        debug!("Page {}: text layer rejected ({:?}); trying OCR", page_number, reason);
        let page = match ocr.ocr_page(pdf_path, page_number).await {
            Ok(ocr_text) => PageText {
                page_number,
                text: clean_text(&ocr_text),
                source: PageSource::Ocr,
            },
            Err(e) => {
                warn!("Page {}: OCR failed, keeping text layer: {}", page_number, e);
                PageText {
                    page_number,
                    text: cleaned,
                    source: PageSource::TextLayerFallback,
                }
            }
        };
        pages.push(page);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::pipeline::ocr::NoOcr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr {
        calls: AtomicUsize,
    }

    impl OcrEngine for FixedOcr {
        async fn ocr_page(
            &self,
            _path: &Path,
            page_number: usize,
        ) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Recovered page {page_number}\nDownloaded by someone"))
        }
    }

    const GOOD_PAGE: &str = "Kirchhoff's current law: currents entering a node sum to zero.\n\
        The voltage law says loop voltages sum to zero as well.\n\
        Together they give one equation per node and per mesh.\n\
        Nodal analysis solves for node voltages directly.\n\
        Mesh analysis solves for loop currents instead.";

    #[tokio::test]
    async fn junk_pages_are_replaced_by_cleaned_ocr_text() {
        let ocr = FixedOcr {
            calls: AtomicUsize::new(0),
        };
        let raw = vec![GOOD_PAGE.to_string(), "lOMoARcPSD|99\n12".to_string()];
        let thresholds = QualityThresholds::default();
        let pages = gate_pages(Path::new("notes.pdf"), raw, &ocr, &thresholds).await;

        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pages[0].source, PageSource::TextLayer);
        assert_eq!(pages[1].source, PageSource::Ocr);
        assert_eq!(pages[1].text, "Recovered page 2");
    }

    #[tokio::test]
    async fn failed_ocr_keeps_text_layer() {
        let raw = vec!["Short page".to_string()];
        let thresholds = QualityThresholds::default();
        let pages = gate_pages(Path::new("notes.pdf"), raw, &NoOcr, &thresholds).await;
        assert_eq!(pages[0].source, PageSource::TextLayerFallback);
        assert_eq!(pages[0].text, "Short page");
    }

    #[test]
    fn pages_join_with_blank_line() {
        let doc = ExtractedDocument {
            pages: vec![
                PageText {
                    page_number: 1,
                    text: "one".into(),
                    source: PageSource::TextLayer,
                },
                PageText {
                    page_number: 2,
                    text: "two".into(),
                    source: PageSource::Ocr,
                },
            ],
        };
        assert_eq!(doc.text(), "one\n\ntwo");
        assert_eq!(doc.junk_pages().count(), 1);
    }

    #[tokio::test]
    async fn missing_pdf_is_fatal() {
        let err = extract_text(Path::new("/no/such.pdf"), &NoOcr, &QualityThresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGenError::FileNotFound { .. }));
    }
}
