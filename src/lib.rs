//! # studygen
//!
//! Turn course PDFs into study material (flashcards, multiple-choice
//! questions and syllabus outlines) with a locally hosted language model.
//!
//! ## Why this crate?
//!
//! Models asked for "only JSON" answer with commentary around it, trailing
//! commas, inconsistent key names and the wrong top-level shape. Course PDFs
//! add their own noise: scanned pages with garbage text layers, watermarks
//! on every page, reference lists. This crate turns both unreliable inputs
//! into schema-valid, deduplicated, bounded collections and never raises to
//! the caller: zero artifacts is the failure signal.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Text     pdfium text layer per page (spawn_blocking)
//!  ├─ 2. Clean    watermarks, reference lists, hyphenation
//!  ├─ 3. Gate     junk pages → vision OCR
//!  ├─ 4. Prompt   flashcards / MCQs / syllabus, single JSON object
//!  ├─ 5. Model    Ollama /api/generate or any edgequake-llm provider
//!  ├─ 6. Recover  locate + repair the JSON span
//!  └─ 7. Validate shape resolution, flexible keys, dedup, bounds
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studygen::{generate_flashcards, ContextInput, ExtractionConfig, OllamaGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Model from STUDYGEN_MODEL / OLLAMA_MODEL, host from OLLAMA_HOST
//!     let config = ExtractionConfig::from_env();
//!     let generator = OllamaGenerator::from_config(&config)?;
//!     let notes = ContextInput::from("Mitochondria are the site of aerobic respiration…");
//!     let cards = generate_flashcards(&generator, "first-year biology", &notes, 10, &config).await;
//!     for card in &cards {
//!         println!("{} → {}", card.front, card.back);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studygen` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! studygen = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use context::ContextInput;
pub use document::{extract_document, extract_text, ExtractedDocument, PageSource, PageText};
pub use error::{ExtractError, StudyGenError};
pub use generate::{
    extract_syllabus, extract_syllabus_blocking, extract_syllabus_from_pdf, generate_flashcards,
    generate_flashcards_blocking, generate_mcqs, generate_mcqs_blocking, try_extract_syllabus,
    try_generate_flashcards, try_generate_mcqs, DEFAULT_FLASHCARD_COUNT, DEFAULT_MCQ_COUNT,
};
pub use ingest::{
    load_folder, prepare_chunks, tag_chunks, ChunkMetadata, ChunkRecord, Chunker, SourceDocument,
    SourceType,
};
pub use output::{ChunkTag, CorrectOption, Flashcard, Mcq, SyllabusUnit, Topic};
pub use pipeline::clean::clean_text;
pub use pipeline::llm::{
    resolve_provider, GenerateRequest, OllamaGenerator, ProviderGenerator, TextGenerator,
};
pub use pipeline::ocr::{NoOcr, OcrEngine, VisionOcr};
pub use pipeline::quality::{is_junk, JunkReason, QualityThresholds};
pub use pipeline::recover::{recover_json, recover_json_object, repair_json_string};
pub use progress::{NoopProgressCallback, ProgressCallback, TaggingProgressCallback};
