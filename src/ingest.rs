//! Ingestion: chunk source documents and tag each chunk with its place in
//! the syllabus.
//!
//! The output, a list of [`ChunkRecord`]s, is what a vector store needs:
//! chunk text plus flat metadata (`subject_code`, `source`, `source_type`,
//! `unit`, `topic`, `subtopic`). Embedding and persistence are the caller's
//! business.
//!
//! Tagging is one model call per chunk, strictly sequential, and never
//! aborts: a chunk whose call fails for any reason is tagged
//! `General / General / ""` and the batch moves on.

use crate::config::ExtractionConfig;
use crate::context::truncate_chars;
use crate::document;
use crate::error::{ExtractError, StudyGenError};
use crate::output::{ChunkTag, SyllabusUnit};
use crate::pipeline::llm::{call_model, GenerateRequest, TextGenerator};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::quality::QualityThresholds;
use crate::pipeline::{recover, validate};
use crate::progress::TaggingProgressCallback;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

// ── Chunking ─────────────────────────────────────────────────────────────────

/// Splits text into overlapping character windows.
///
/// Inside each window the split point prefers a paragraph break, then a line
/// break, then a space, as long as it falls in the second half of the
/// window; otherwise the window is cut at its full length. Chunks are
/// trimmed and blank chunks skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    /// `chunk_size` is at least 1; `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                start + self.break_point(&chars[start..hard_end])
            };

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == len {
                break;
            }

            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }
        chunks
    }

    /// Offset just past the preferred separator in `window`.
    fn break_point(&self, window: &[char]) -> usize {
        let min = (self.overlap + 1).max(window.len() / 2);
        let after = |pos: Option<usize>, width: usize| pos.map(|i| i + width).filter(|&e| e > min);

        after(window.windows(2).rposition(|w| w == ['\n', '\n']), 2)
            .or_else(|| after(window.iter().rposition(|&c| c == '\n'), 1))
            .or_else(|| after(window.iter().rposition(|&c| c == ' '), 1))
            .unwrap_or(window.len())
    }
}

// ── Source documents ─────────────────────────────────────────────────────────

/// What kind of material a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Syllabus,
    Notes,
    PastPapers,
}

impl SourceType {
    pub const ALL: [SourceType; 3] = [Self::Syllabus, Self::Notes, Self::PastPapers];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syllabus => "syllabus",
            Self::Notes => "notes",
            Self::PastPapers => "past_papers",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = StudyGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StudyGenError::InvalidConfig(format!("unknown source type '{s}'")))
    }
}

/// Text of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    /// File name the text came from.
    pub source: String,
    pub source_type: SourceType,
}

impl SourceDocument {
    /// Extract a PDF's text through the quality gate.
    pub async fn from_pdf<O: OcrEngine>(
        path: &Path,
        source_type: SourceType,
        ocr: &O,
        thresholds: &QualityThresholds,
    ) -> Result<Self, StudyGenError> {
        let text = document::extract_text(path, ocr, thresholds).await?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            text,
            source,
            source_type,
        })
    }
}

/// Load every `*.pdf` in `folder` (non-recursive, sorted by name).
///
/// A missing folder yields nothing; a PDF that cannot be read is logged and
/// skipped.
pub async fn load_folder<O: OcrEngine>(
    folder: &Path,
    source_type: SourceType,
    ocr: &O,
    thresholds: &QualityThresholds,
) -> Vec<SourceDocument> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        debug!("{}: folder not found, skipping", folder.display());
        return Vec::new();
    };
    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        match SourceDocument::from_pdf(&path, source_type, ocr, thresholds).await {
            Ok(doc) => {
                info!("{:11} | {}", source_type.as_str().to_uppercase(), doc.source);
                docs.push(doc);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    info!("Loaded {} documents from {}", docs.len(), source_type);
    docs
}

// ── Tagging ──────────────────────────────────────────────────────────────────

/// Tag each chunk with its syllabus unit, topic and subtopic.
///
/// Returns exactly one tag per chunk, in order. An empty syllabus tags every
/// chunk `General` without calling the model.
pub async fn tag_chunks<G: TextGenerator>(
    generator: &G,
    chunks: &[String],
    units: &[SyllabusUnit],
    config: &ExtractionConfig,
    progress: &dyn TaggingProgressCallback,
) -> Vec<ChunkTag> {
    let total = chunks.len();
    progress.on_tagging_start(total);

    if units.is_empty() {
        debug!("No syllabus: tagging {} chunks as General", total);
        progress.on_tagging_complete(total, 0);
        return vec![ChunkTag::default(); total];
    }

    let summary = prompts::syllabus_summary(units);
    let timeout = Duration::from_secs(config.tagging_timeout_secs);
    info!("Tagging {} chunks using {}", total, generator.model_name());

    let mut tags = Vec::with_capacity(total);
    let mut model_tagged = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if i % 10 == 0 {
            info!("Processing chunk {}/{}", i, total);
        }
        let excerpt = truncate_chars(chunk, config.tagging_excerpt_chars);
        let request = GenerateRequest::new(prompts::tagging_prompt(&summary, excerpt), timeout);

        match tag_one(generator, &request).await {
            Ok(tag) => {
                model_tagged += 1;
                progress.on_chunk_tagged(i + 1, total, &tag);
                tags.push(tag);
            }
            Err(e) => {
                warn!("Chunk {}/{}: tagging failed, using General: {}", i + 1, total, e);
                progress.on_chunk_fallback(i + 1, total, &e.to_string());
                tags.push(ChunkTag::default());
            }
        }
    }

    progress.on_tagging_complete(total, model_tagged);
    tags
}

async fn tag_one<G: TextGenerator>(
    generator: &G,
    request: &GenerateRequest,
) -> Result<ChunkTag, ExtractError> {
    let raw = call_model(generator, request).await?;
    let value = recover::recover_json_object(&raw)?;
    Ok(validate::validate_chunk_tag(&value))
}

// ── Records ──────────────────────────────────────────────────────────────────

/// Flat per-chunk metadata for the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub subject_code: String,
    pub source: String,
    pub source_type: SourceType,
    pub unit: String,
    pub topic: String,
    pub subtopic: String,
}

/// One chunk ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Chunk every document and tag the chunks against `units`.
pub async fn prepare_chunks<G: TextGenerator>(
    generator: &G,
    subject_code: &str,
    documents: &[SourceDocument],
    units: &[SyllabusUnit],
    chunker: &Chunker,
    config: &ExtractionConfig,
    progress: &dyn TaggingProgressCallback,
) -> Vec<ChunkRecord> {
    let mut texts = Vec::new();
    let mut origins = Vec::new();
    for doc in documents {
        for chunk in chunker.split(&doc.text) {
            texts.push(chunk);
            origins.push(doc);
        }
    }
    info!(
        "{}: {} chunks from {} documents",
        subject_code,
        texts.len(),
        documents.len()
    );

    let tags = tag_chunks(generator, &texts, units, config, progress).await;

    texts
        .into_iter()
        .zip(origins)
        .zip(tags)
        .map(|((text, doc), tag)| ChunkRecord {
            text,
            metadata: ChunkMetadata {
                subject_code: subject_code.to_string(),
                source: doc.source.clone(),
                source_type: doc.source_type,
                unit: tag.unit,
                topic: tag.topic,
                subtopic: tag.subtopic,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Topic;
    use crate::pipeline::llm::testing::ScriptedGenerator;
    use crate::progress::NoopProgressCallback;

    fn syllabus() -> Vec<SyllabusUnit> {
        vec![SyllabusUnit {
            unit_name: "Unit I: Graphs".into(),
            topics: vec![Topic {
                topic_name: "Shortest paths".into(),
                subtopics: vec![],
            }],
        }]
    }

    // ── Chunker ──────────────────────────────────────────────────────────

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(Chunker::default().split("  hello world \n"), vec!["hello world"]);
        assert!(Chunker::default().split(" \n\n ").is_empty());
    }

    #[test]
    fn hard_cut_windows_overlap() {
        let text = "x".repeat(2500);
        let chunks = Chunker::new(1000, 200).split(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 900]);
    }

    #[test]
    fn prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(600), "b".repeat(600));
        let chunks = Chunker::new(1000, 200).split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(600));
        assert!(chunks[1].starts_with('a'), "overlap carries into the next chunk");
        assert!(chunks[1].ends_with(&"b".repeat(600)));
    }

    #[test]
    fn falls_back_to_word_break() {
        let text = "word ".repeat(50);
        let chunks = Chunker::new(32, 8).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 32));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.ends_with("word")));
    }

    #[test]
    fn overlap_is_clamped() {
        let c = Chunker::new(10, 50);
        assert_eq!(c.overlap(), 9);
        assert_eq!(c.split(&"z".repeat(25)).len(), 16);
    }

    // ── Tagging ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_syllabus_tags_general_without_calls() {
        let g = ScriptedGenerator::replying("{}");
        let chunks = vec!["one".to_string(), "two".to_string()];
        let config = ExtractionConfig::default();
        let tags = tag_chunks(&g, &chunks, &[], &config, &NoopProgressCallback).await;
        assert_eq!(tags, vec![ChunkTag::default(); 2]);
        assert_eq!(g.calls(), 0);
    }

    #[tokio::test]
    async fn failures_fall_back_per_chunk() {
        let g = ScriptedGenerator::new([
            Ok(
                r#"{"unit": "Unit I: Graphs", "topic": "Shortest paths", "subtopic": "Dijkstra"}"#
                    .to_string(),
            ),
            Err(ExtractError::Timeout { secs: 30 }),
            Ok("no json here".to_string()),
            Ok(r#"{"unit": "Unit I: Graphs"}"#.to_string()),
        ]);
        let chunks: Vec<String> = (0..4).map(|i| format!("chunk {i}")).collect();
        let config = ExtractionConfig::default();
        let tags = tag_chunks(&g, &chunks, &syllabus(), &config, &NoopProgressCallback).await;

        assert_eq!(tags.len(), 4);
        assert_eq!(tags[0].subtopic, "Dijkstra");
        assert!(tags[1].is_general());
        assert!(tags[2].is_general());
        assert_eq!(tags[3].unit, "Unit I: Graphs");
        assert_eq!(tags[3].topic, "General");
        assert_eq!(g.calls(), 4);
    }

    #[tokio::test]
    async fn array_fields_do_not_discard_the_tag() {
        let g = ScriptedGenerator::new([
            Ok(
                r#"{"unit": "Unit I: Graphs", "topic": "Shortest paths", "subtopic": []}"#
                    .to_string(),
            ),
            Ok(r#"Tag: {"unit": "Unit I: Graphs", "topic": "BFS", "subtopic": ["x"]}"#.to_string()),
        ]);
        let chunks = vec!["relax edges".to_string(), "visit by layers".to_string()];
        let config = ExtractionConfig::default();
        let tags = tag_chunks(&g, &chunks, &syllabus(), &config, &NoopProgressCallback).await;

        assert_eq!(tags[0].unit, "Unit I: Graphs");
        assert_eq!(tags[0].topic, "Shortest paths");
        assert_eq!(tags[0].subtopic, "");
        assert_eq!(tags[1].unit, "Unit I: Graphs");
        assert_eq!(tags[1].topic, "BFS");
        assert_eq!(tags[1].subtopic, "");
    }

    #[tokio::test]
    async fn tagging_prompt_uses_excerpt_and_timeout() {
        let g = ScriptedGenerator::replying("{}");
        let chunk = format!("{}{}", "p".repeat(500), "q".repeat(100));
        let config = ExtractionConfig::default();
        let _ = tag_chunks(&g, &[chunk], &syllabus(), &config, &NoopProgressCallback).await;

        let req = g.last_request();
        assert_eq!(req.timeout, Duration::from_secs(30));
        assert_eq!(req.temperature, None);
        assert!(req.prompt.contains("- Unit I: Graphs\n  * Shortest paths"));
        assert!(req.prompt.contains(&"p".repeat(500)));
        assert!(!req.prompt.contains("pq"));
    }

    // ── Records ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn records_carry_document_and_tag_metadata() {
        let g = ScriptedGenerator::new([
            Ok(r#"{"unit": "Unit I: Graphs", "topic": "Shortest paths"}"#.to_string()),
            Ok("{}".to_string()),
        ]);
        let docs = vec![
            SourceDocument {
                text: "Dijkstra's algorithm".into(),
                source: "notes1.pdf".into(),
                source_type: SourceType::Notes,
            },
            SourceDocument {
                text: "  ".into(),
                source: "blank.pdf".into(),
                source_type: SourceType::Notes,
            },
            SourceDocument {
                text: "2023 exam Q1".into(),
                source: "paper.pdf".into(),
                source_type: SourceType::PastPapers,
            },
        ];
        let records = prepare_chunks(
            &g,
            "CS201",
            &docs,
            &syllabus(),
            &Chunker::default(),
            &ExtractionConfig::default(),
            &NoopProgressCallback,
        )
        .await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata.source, "notes1.pdf");
        assert_eq!(records[0].metadata.topic, "Shortest paths");
        assert_eq!(records[1].metadata.source_type, SourceType::PastPapers);
        assert_eq!(records[1].metadata.unit, "General");

        let json = serde_json::to_value(&records[1].metadata).unwrap();
        assert_eq!(json["source_type"], "past_papers");
        assert_eq!(json["subject_code"], "CS201");
    }

    #[test]
    fn source_type_parses() {
        assert_eq!("past_papers".parse::<SourceType>().unwrap(), SourceType::PastPapers);
        assert!("slides".parse::<SourceType>().is_err());
    }

    #[tokio::test]
    async fn missing_folder_loads_nothing() {
        let docs = load_folder(
            Path::new("/no/such/dir"),
            SourceType::Notes,
            &crate::pipeline::ocr::NoOcr,
            &QualityThresholds::default(),
        )
        .await;
        assert!(docs.is_empty());
    }
}
