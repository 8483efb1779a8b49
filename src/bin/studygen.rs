//! CLI binary for studygen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, picks a model backend and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use studygen::pipeline::llm::create_provider;
use studygen::{
    extract_document, extract_syllabus, generate_flashcards, generate_mcqs, load_folder,
    prepare_chunks, resolve_provider, ChunkTag, Chunker, ContextInput, ExtractError,
    ExtractionConfig, GenerateRequest, NoOcr, OcrEngine, OllamaGenerator, ProviderGenerator,
    QualityThresholds, SourceDocument, SourceType, TaggingProgressCallback, TextGenerator,
    VisionOcr,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar for chunk tagging.
struct CliTaggingProgress {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
}

impl CliTaggingProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Chunking documents…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            fallbacks: AtomicUsize::new(0),
        }
    }
}

impl TaggingProgressCallback for CliTaggingProgress {
    fn on_tagging_start(&self, total_chunks: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>4}/{len} chunks  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_chunks as u64);
        self.bar.set_prefix("Tagging");
        self.bar.reset_eta();
    }

    fn on_chunk_tagged(&self, _chunk: usize, _total: usize, tag: &ChunkTag) {
        self.bar.set_message(tag.unit.clone());
        self.bar.inc(1);
    }

    fn on_chunk_fallback(&self, chunk: usize, total: usize, error: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        let msg: String = error.chars().take(79).collect();
        self.bar.println(format!(
            "  {} Chunk {:>4}/{:<4}  {}",
            red("✗"),
            chunk,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_tagging_complete(&self, total_chunks: usize, model_tagged: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} chunks tagged by the model{}",
            if fallbacks == 0 { green("✔") } else { cyan("⚠") },
            bold(&model_tagged.to_string()),
            total_chunks,
            if fallbacks == 0 {
                String::new()
            } else {
                format!("  ({} fell back to General)", red(&fallbacks.to_string()))
            }
        );
    }
}

// ── Backends ─────────────────────────────────────────────────────────────────

/// The model backend selected on the command line.
enum Backend {
    Ollama(OllamaGenerator),
    Provider(ProviderGenerator),
}

impl TextGenerator for Backend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
        match self {
            Backend::Ollama(g) => g.generate(request).await,
            Backend::Provider(g) => g.generate(request).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Backend::Ollama(g) => g.model_name(),
            Backend::Provider(g) => g.model_name(),
        }
    }
}

/// The OCR engine selected on the command line.
enum Ocr {
    Disabled(NoOcr),
    Vision(VisionOcr),
}

impl OcrEngine for Ocr {
    async fn ocr_page(&self, pdf_path: &Path, page_number: usize) -> Result<String, ExtractError> {
        match self {
            Ocr::Disabled(o) => o.ocr_page(pdf_path, page_number).await,
            Ocr::Vision(o) => o.ocr_page(pdf_path, page_number).await,
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean text of a PDF, flagging junk pages
  studygen text notes.pdf

  # Ten flashcards from lecture notes (Ollama at OLLAMA_HOST)
  studygen flashcards notes.pdf --student "second-year CS"

  # Five MCQs as JSON
  studygen --json mcqs unit3.txt --count 5

  # Syllabus outline, OCR fallback through a vision provider
  studygen --ocr --ocr-provider openai syllabus syllabus.pdf

  # Chunk and tag a subject's notes against its syllabus
  studygen tag notes/ past_papers/ --syllabus syllabus.pdf --subject CS201 --json

ENVIRONMENT VARIABLES:
  STUDYGEN_MODEL          Generation model (falls back to OLLAMA_MODEL)
  OLLAMA_HOST             Ollama endpoint (default http://localhost:11434)
  EDGEQUAKE_LLM_PROVIDER  Route generation through an edgequake-llm provider
  OPENAI_API_KEY          Key for the openai provider (OCR or generation)
  PDFIUM_LIB_PATH         pdfium library file or the directory holding it
"#;

#[derive(Parser, Debug)]
#[command(
    name = "studygen",
    version,
    about = "Generate flashcards, MCQs and syllabus outlines from course PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    ocr: OcrArgs,

    /// Print results as JSON.
    #[arg(long, global = true, env = "STUDYGEN_JSON")]
    json: bool,

    /// Debug logging.
    #[arg(short, long, global = true, env = "STUDYGEN_VERBOSE")]
    verbose: bool,

    /// Errors only; no progress bar.
    #[arg(short, long, global = true, env = "STUDYGEN_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Generation model. Default: qwen2.5:7b.
    #[arg(long, global = true, env = "STUDYGEN_MODEL")]
    model: Option<String>,

    /// Ollama endpoint.
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Use an edgequake-llm provider (openai, anthropic, gemini, ollama, …)
    /// instead of the Ollama generate endpoint.
    #[arg(long, global = true, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Generation timeout in seconds.
    #[arg(long, global = true, default_value_t = 120)]
    timeout: u64,

    /// Sampling temperature for flashcards and MCQs.
    #[arg(long, global = true, default_value_t = 0.2)]
    temperature: f32,
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// Transcribe junk pages with a vision model.
    #[arg(long, global = true)]
    ocr: bool,

    /// Vision provider for OCR. Auto-detected from API keys if not set.
    #[arg(long, global = true, env = "STUDYGEN_OCR_PROVIDER")]
    ocr_provider: Option<String>,

    /// Vision model for OCR.
    #[arg(long, global = true, env = "STUDYGEN_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Minimum characters for a page's text layer to count as usable.
    #[arg(long, global = true, default_value_t = 50)]
    min_len: usize,

    /// Maximum share of the most repeated line.
    #[arg(long, global = true, default_value_t = 0.25)]
    dup_thresh: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and clean a PDF's text, reporting pages that failed the quality gate.
    Text { pdf: PathBuf },

    /// Run the quality gate on a text file (`-` for stdin).
    Check { file: PathBuf },

    /// Generate flashcards from a PDF or text file.
    Flashcards(GenerateArgs),

    /// Generate multiple-choice questions from a PDF or text file.
    Mcqs(GenerateArgs),

    /// Structure a syllabus PDF or text file into units and topics.
    Syllabus { input: PathBuf },

    /// Chunk documents and tag each chunk against a syllabus.
    Tag(TagArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// PDF, text file, or `-` for stdin.
    input: PathBuf,

    /// Number of items to request.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Free-text description of the learner, included in the prompt.
    #[arg(long, default_value = "")]
    student: String,
}

#[derive(Args, Debug)]
struct TagArgs {
    /// PDFs, or folders of PDFs, to chunk.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Syllabus PDF the chunks are tagged against.
    #[arg(long)]
    syllabus: Option<PathBuf>,

    /// Subject code stored with every chunk.
    #[arg(long)]
    subject: String,

    /// Source type of the inputs.
    #[arg(long, default_value = "notes")]
    source_type: SourceType,

    #[arg(long, default_value_t = studygen::ingest::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, default_value_t = studygen::ingest::DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.json && matches!(cli.command, Command::Tag(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match &cli.command {
        Command::Text { pdf } => run_text(&cli, &config, pdf).await,
        Command::Check { file } => run_check(&cli, &config, file),
        Command::Flashcards(args) => run_flashcards(&cli, &config, args).await,
        Command::Mcqs(args) => run_mcqs(&cli, &config, args).await,
        Command::Syllabus { input } => run_syllabus(&cli, &config, input).await,
        Command::Tag(args) => run_tag(&cli, &config, args, show_progress).await,
    }
}

fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let env = ExtractionConfig::from_env();
    ExtractionConfig::builder()
        .model(cli.model.model.clone().unwrap_or(env.model))
        .base_url(cli.model.host.clone().unwrap_or(env.base_url))
        .generation_timeout_secs(cli.model.timeout)
        .temperature(cli.model.temperature)
        .quality(QualityThresholds {
            min_len: cli.ocr.min_len,
            dup_thresh: cli.ocr.dup_thresh,
            ..QualityThresholds::default()
        })
        .build()
        .context("Invalid configuration")
}

fn build_backend(cli: &Cli, config: &ExtractionConfig) -> Result<Backend> {
    match cli.model.provider.as_deref() {
        Some(name) => {
            let provider = create_provider(name, &config.model)
                .with_context(|| format!("Failed to create provider '{name}'"))?;
            Ok(Backend::Provider(ProviderGenerator::new(
                provider,
                config.model.clone(),
            )))
        }
        None => Ok(Backend::Ollama(
            OllamaGenerator::from_config(config).context("Failed to create Ollama client")?,
        )),
    }
}

fn build_ocr(cli: &Cli, config: &ExtractionConfig) -> Result<Ocr> {
    if !cli.ocr.ocr {
        return Ok(Ocr::Disabled(NoOcr));
    }
    let provider = resolve_provider(cli.ocr.ocr_provider.as_deref(), cli.ocr.ocr_model.as_deref())
        .context("Failed to resolve the OCR vision provider")?;
    Ok(Ocr::Vision(VisionOcr::new(provider, config)))
}

/// Read a PDF (through the quality gate) or a text file (`-` = stdin).
async fn read_input(cli: &Cli, config: &ExtractionConfig, input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    let is_pdf = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        let ocr = build_ocr(cli, config)?;
        let doc = extract_document(input, &ocr, &config.quality)
            .await
            .with_context(|| format!("Failed to extract text from {}", input.display()))?;
        Ok(doc.text())
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialise output")?
    );
    Ok(())
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_text(cli: &Cli, config: &ExtractionConfig, pdf: &Path) -> Result<()> {
    let ocr = build_ocr(cli, config)?;
    let doc = extract_document(pdf, &ocr, &config.quality)
        .await
        .with_context(|| format!("Failed to extract text from {}", pdf.display()))?;

    if cli.json {
        return print_json(&doc);
    }
    println!("{}", doc.text());
    if !cli.quiet {
        for page in doc.junk_pages() {
            eprintln!(
                "{} page {:>3}  {}",
                cyan("⚠"),
                page.page_number,
                dim(&format!("{:?}", page.source))
            );
        }
    }
    Ok(())
}

fn run_check(cli: &Cli, config: &ExtractionConfig, file: &Path) -> Result<()> {
    let text = if file == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    };

    let reason = config.quality.classify(&text);
    if cli.json {
        return print_json(&serde_json::json!({
            "junk": reason.is_some(),
            "reason": reason.map(|r| format!("{r:?}")),
        }));
    }
    match reason {
        None => println!("{} usable", green("✔")),
        Some(r) => println!("{} junk  {}", red("✘"), dim(&format!("{r:?}"))),
    }
    Ok(())
}

async fn run_flashcards(cli: &Cli, config: &ExtractionConfig, args: &GenerateArgs) -> Result<()> {
    let backend = build_backend(cli, config)?;
    let text = read_input(cli, config, &args.input).await?;
    let count = args.count.unwrap_or(studygen::DEFAULT_FLASHCARD_COUNT);
    let context = ContextInput::Text(text);
    let cards = generate_flashcards(&backend, &args.student, &context, count, config).await;
    if cards.is_empty() {
        bail!("No flashcards generated (run with -v for the reason)");
    }

    if cli.json {
        return print_json(&cards);
    }
    for (i, card) in cards.iter().enumerate() {
        println!("{} {}", bold(&format!("{:>2}.", i + 1)), card.front);
        println!("    {}", dim(&card.back));
    }
    Ok(())
}

async fn run_mcqs(cli: &Cli, config: &ExtractionConfig, args: &GenerateArgs) -> Result<()> {
    let backend = build_backend(cli, config)?;
    let text = read_input(cli, config, &args.input).await?;
    let count = args.count.unwrap_or(studygen::DEFAULT_MCQ_COUNT);
    let context = ContextInput::Text(text);
    let mcqs = generate_mcqs(&backend, &args.student, &context, count, config).await;
    if mcqs.is_empty() {
        bail!("No MCQs generated (run with -v for the reason)");
    }

    if cli.json {
        return print_json(&mcqs);
    }
    for (i, mcq) in mcqs.iter().enumerate() {
        println!("{} {}", bold(&format!("{:>2}.", i + 1)), mcq.question);
        for (j, option) in mcq.options.iter().enumerate() {
            let Some(letter) = studygen::CorrectOption::from_index(j) else {
                break;
            };
            if letter == mcq.correct_option {
                println!("    {} {}) {}", green("✓"), letter, option);
            } else {
                println!("      {}) {}", letter, option);
            }
        }
    }
    Ok(())
}

async fn run_syllabus(cli: &Cli, config: &ExtractionConfig, input: &Path) -> Result<()> {
    let backend = build_backend(cli, config)?;
    let text = read_input(cli, config, input).await?;
    let units = extract_syllabus(&backend, &ContextInput::Text(text), config).await;
    if units.is_empty() {
        bail!("No syllabus units extracted (run with -v for the reason)");
    }

    if cli.json {
        return print_json(&units);
    }
    for unit in &units {
        println!("{}", bold(&unit.unit_name));
        for topic in &unit.topics {
            println!("  • {}", topic.topic_name);
            for sub in &topic.subtopics {
                println!("      {}", dim(&format!("- {sub}")));
            }
        }
    }
    Ok(())
}

async fn run_tag(
    cli: &Cli,
    config: &ExtractionConfig,
    args: &TagArgs,
    show_progress: bool,
) -> Result<()> {
    let backend = build_backend(cli, config)?;
    let ocr = build_ocr(cli, config)?;

    let units = match &args.syllabus {
        Some(path) => {
            let syllabus = studygen::extract_syllabus_from_pdf(&backend, &ocr, path, config).await;
            if syllabus.is_empty() && !cli.quiet {
                eprintln!(
                    "{} syllabus gave no units; every chunk will be tagged General",
                    cyan("⚠")
                );
            }
            syllabus
        }
        None => Vec::new(),
    };

    let mut documents = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            documents.extend(load_folder(input, args.source_type, &ocr, &config.quality).await);
        } else {
            let doc = SourceDocument::from_pdf(input, args.source_type, &ocr, &config.quality)
                .await
                .with_context(|| format!("Failed to extract text from {}", input.display()))?;
            documents.push(doc);
        }
    }

    let chunker = Chunker::new(args.chunk_size, args.chunk_overlap);
    let cli_progress;
    let progress: &dyn TaggingProgressCallback = if show_progress {
        cli_progress = CliTaggingProgress::new();
        &cli_progress
    } else {
        &studygen::NoopProgressCallback
    };
    let records = prepare_chunks(
        &backend,
        &args.subject,
        &documents,
        &units,
        &chunker,
        config,
        progress,
    )
    .await;

    if cli.json {
        return print_json(&records);
    }
    for record in &records {
        println!(
            "{}  {} / {}  {}",
            dim(&record.metadata.source),
            record.metadata.unit,
            record.metadata.topic,
            dim(&format!("{} chars", record.text.chars().count()))
        );
    }
    Ok(())
}
