//! Extraction orchestrator: context → prompt → model → recovery → validator.
//!
//! Every artifact type has three entry points:
//!
//! - `try_*` returns `Result<Vec<_>, ExtractError>` so tests and callers that
//!   care can see *why* nothing came back;
//! - the plain async function logs the failure and returns an empty `Vec`;
//! - `*_blocking` runs the plain function on a fresh current-thread runtime
//!   for synchronous callers. It must not be called from inside a runtime.
//!
//! Zero artifacts is the uniform failure signal of the plain entry points.
//! They never panic and never return an error.

use crate::config::ExtractionConfig;
use crate::context::ContextInput;
use crate::document;
use crate::error::ExtractError;
use crate::output::{Flashcard, Mcq, SyllabusUnit};
use crate::pipeline::llm::{call_model, GenerateRequest, TextGenerator};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::{recover, validate};
use crate::prompts;
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Flashcards requested when the caller has no preference.
pub const DEFAULT_FLASHCARD_COUNT: usize = 10;

/// MCQs requested when the caller has no preference.
pub const DEFAULT_MCQ_COUNT: usize = 5;

/// One extraction task, fully described.
struct Task<'a, T> {
    kind: &'static str,
    context: &'a ContextInput,
    max_chars: usize,
    prompt: Box<dyn FnOnce(&str) -> String + Send + 'a>,
    temperature: Option<f32>,
    timeout: Duration,
    validate: fn(&Value) -> Result<Vec<T>, ExtractError>,
    limit: Option<usize>,
}

async fn run_task<G: TextGenerator, T>(
    generator: &G,
    task: Task<'_, T>,
) -> Result<Vec<T>, ExtractError> {
    let context = task.context.normalise(task.max_chars);
    if context.trim().is_empty() {
        return Err(ExtractError::EmptyContext);
    }

    let mut request = GenerateRequest::new((task.prompt)(&context), task.timeout);
    request.temperature = task.temperature;

    let raw = call_model(generator, &request).await?;
    let value = recover::recover_json(&raw)?;
    let mut items = (task.validate)(&value)?;
    if let Some(limit) = task.limit {
        items.truncate(limit);
    }
    info!("{}: {} valid items", task.kind, items.len());
    Ok(items)
}

/// Collapse a task result to a collection, logging the reason for failure.
fn or_empty<T>(kind: &str, result: Result<Vec<T>, ExtractError>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(ExtractError::EmptyContext) => {
            debug!("{kind}: empty context, model not called");
            Vec::new()
        }
        Err(e @ (ExtractError::Recovery { .. } | ExtractError::Shape { .. })) => {
            warn!("{kind}: unusable model output: {e}");
            Vec::new()
        }
        Err(e) => {
            error!("{kind}: model call failed: {e}");
            Vec::new()
        }
    }
}

fn block_on_empty<F, T>(kind: &str, fut: F) -> Vec<T>
where
    F: Future<Output = Vec<T>>,
{
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(fut),
        Err(e) => {
            error!("{kind}: failed to create tokio runtime: {e}");
            Vec::new()
        }
    }
}

// ── Flashcards ───────────────────────────────────────────────────────────────

/// Generate up to `count` flashcards from `context`.
pub async fn try_generate_flashcards<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Result<Vec<Flashcard>, ExtractError> {
    let task = Task {
        kind: "flashcards",
        context,
        max_chars: config.max_context_chars,
        prompt: Box::new(move |ctx: &str| prompts::flashcard_prompt(student_info, ctx, count)),
        temperature: Some(config.temperature),
        timeout: Duration::from_secs(config.generation_timeout_secs),
        validate: validate::validate_flashcards,
        limit: Some(count),
    };
    run_task(generator, task).await
}

/// Like [`try_generate_flashcards`], returning an empty `Vec` on failure.
pub async fn generate_flashcards<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Vec<Flashcard> {
    or_empty(
        "flashcards",
        try_generate_flashcards(generator, student_info, context, count, config).await,
    )
}

/// Blocking form of [`generate_flashcards`].
pub fn generate_flashcards_blocking<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Vec<Flashcard> {
    block_on_empty(
        "flashcards",
        generate_flashcards(generator, student_info, context, count, config),
    )
}

// ── MCQs ─────────────────────────────────────────────────────────────────────

/// Generate up to `count` multiple-choice questions from `context`.
pub async fn try_generate_mcqs<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Result<Vec<Mcq>, ExtractError> {
    let task = Task {
        kind: "mcqs",
        context,
        max_chars: config.max_context_chars,
        prompt: Box::new(move |ctx: &str| prompts::mcq_prompt(student_info, ctx, count)),
        temperature: Some(config.temperature),
        timeout: Duration::from_secs(config.generation_timeout_secs),
        validate: validate::validate_mcqs,
        limit: Some(count),
    };
    run_task(generator, task).await
}

/// Like [`try_generate_mcqs`], returning an empty `Vec` on failure.
pub async fn generate_mcqs<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Vec<Mcq> {
    or_empty(
        "mcqs",
        try_generate_mcqs(generator, student_info, context, count, config).await,
    )
}

/// Blocking form of [`generate_mcqs`].
pub fn generate_mcqs_blocking<G: TextGenerator>(
    generator: &G,
    student_info: &str,
    context: &ContextInput,
    count: usize,
    config: &ExtractionConfig,
) -> Vec<Mcq> {
    block_on_empty(
        "mcqs",
        generate_mcqs(generator, student_info, context, count, config),
    )
}

// ── Syllabus ─────────────────────────────────────────────────────────────────

/// Structure raw syllabus text into units and topics.
pub async fn try_extract_syllabus<G: TextGenerator>(
    generator: &G,
    syllabus_text: &ContextInput,
    config: &ExtractionConfig,
) -> Result<Vec<SyllabusUnit>, ExtractError> {
    let task = Task {
        kind: "syllabus",
        context: syllabus_text,
        max_chars: config.max_syllabus_chars,
        prompt: Box::new(prompts::syllabus_prompt),
        temperature: None,
        timeout: Duration::from_secs(config.generation_timeout_secs),
        validate: validate::validate_syllabus,
        limit: None,
    };
    run_task(generator, task).await
}

/// Like [`try_extract_syllabus`], returning an empty `Vec` on failure.
pub async fn extract_syllabus<G: TextGenerator>(
    generator: &G,
    syllabus_text: &ContextInput,
    config: &ExtractionConfig,
) -> Vec<SyllabusUnit> {
    or_empty(
        "syllabus",
        try_extract_syllabus(generator, syllabus_text, config).await,
    )
}

/// Blocking form of [`extract_syllabus`].
pub fn extract_syllabus_blocking<G: TextGenerator>(
    generator: &G,
    syllabus_text: &ContextInput,
    config: &ExtractionConfig,
) -> Vec<SyllabusUnit> {
    block_on_empty("syllabus", extract_syllabus(generator, syllabus_text, config))
}

/// Extract a syllabus PDF's text, then structure it.
///
/// A missing or unreadable PDF is logged and yields an empty `Vec`.
pub async fn extract_syllabus_from_pdf<G: TextGenerator, O: OcrEngine>(
    generator: &G,
    ocr: &O,
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Vec<SyllabusUnit> {
    let text = match document::extract_text(pdf_path, ocr, &config.quality).await {
        Ok(text) => text,
        Err(e) => {
            error!("syllabus: cannot read {}: {e}", pdf_path.display());
            return Vec::new();
        }
    };
    extract_syllabus(generator, &ContextInput::Text(text), config).await
}
