//! Error types for the studygen library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyGenError`]: **fatal**, the operation cannot proceed at all
//!   (missing file, corrupt PDF, pdfium not available, provider not
//!   configured). Returned as `Err(StudyGenError)` from document loading and
//!   configuration.
//!
//! * [`ExtractError`]: **recoverable**, one extraction attempt failed (model
//!   unreachable, unparseable output, wrong JSON shape). The `try_*`
//!   entry points in [`crate::generate`] return it so the reason stays
//!   inspectable; the plain entry points log it and return an empty
//!   collection instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a document load, a client build or a config build.
#[derive(Debug, Error)]
pub enum StudyGenError {
    // ── Document ─────────────────────────────────────────────────────────
    #[error("no such file: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("cannot read '{path}': permission denied")]
    PermissionDenied { path: PathBuf },

    /// The first four bytes are not `%PDF`.
    #[error("'{path}' does not look like a PDF (starts with {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    #[error("pdfium could not open '{path}': {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("'{path}' is password-protected; course PDFs must be readable without one")]
    PasswordRequired { path: PathBuf },

    /// Neither `PDFIUM_LIB_PATH` nor the system library could be loaded.
    #[error(
        "pdfium is not available: {0}\n\
Set PDFIUM_LIB_PATH to the pdfium library (or its directory), or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Model ────────────────────────────────────────────────────────────
    /// An `edgequake-llm` provider could not be created (unknown name,
    /// missing API key).
    #[error("provider '{provider}' is unavailable: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Setup ────────────────────────────────────────────────────────────
    #[error("bad configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A recoverable failure of one extraction attempt.
///
/// Variants follow the failure taxonomy of the extraction pipeline: unusable
/// context, transport, recovery, and shape. Entry-level defects (a single
/// malformed flashcard) never surface here; validators drop them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// Context was blank after normalisation; no model call was made.
    #[error("context is empty")]
    EmptyContext,

    /// Connection, DNS, TLS or body-decoding failure talking to the model.
    #[error("model transport failed: {detail}")]
    Transport { detail: String },

    /// The model endpoint answered with a non-success status.
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The model call exceeded its timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model answered successfully but with no text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// No parseable JSON could be recovered from the model output.
    #[error("no JSON could be recovered: {detail} (output starts with: {snippet:?})")]
    Recovery { detail: String, snippet: String },

    /// JSON parsed but holds no recognisable artifact collection.
    #[error("JSON has no recognisable collection (found {found})")]
    Shape { found: String },

    /// No OCR engine is configured.
    #[error("OCR is not available")]
    OcrUnavailable,

    /// A page could not be rendered for OCR.
    #[error("page {page}: rendering failed: {detail}")]
    Render { page: usize, detail: String },
}

/// Truncate `text` to at most `max_chars` characters for log output.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
