//! Pipeline stages for text extraction and structured generation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ clean ──▶ quality ─┬─▶ (context) ──▶ llm ──▶ recover ──▶ validate
//! (path)   (pdfium)                       └─▶ ocr (encode + vision model)
//! ```
//!
//! 1. [`input`]    check the path exists and carries the `%PDF` magic bytes
//! 2. [`render`]   page text layers, and page rasters for OCR; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`clean`]    drop watermarks and reference lists, join hyphenated wraps
//! 4. [`quality`]  flag pages whose text is too short, repetitive or uniform
//! 5. [`ocr`] / [`encode`]  transcribe flagged pages with a vision model
//! 6. [`llm`]      the only stage with network I/O for generation
//! 7. [`recover`]  pull a parseable JSON value out of raw model text
//! 8. [`validate`] map that value onto flashcards, MCQs, syllabus units or
//!    chunk tags

pub mod clean;
pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod quality;
pub mod recover;
pub mod render;
pub mod validate;
