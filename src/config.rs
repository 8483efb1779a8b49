//! Configuration types for artifact extraction.
//!
//! Every knob of the pipeline lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. One struct means one place to read defaults,
//! one thing to clone into a worker, and one thing to print when two runs
//! disagree.
//!
//! The model name is read from the environment once, at startup, through
//! [`ExtractionConfig::from_env`]; nothing in the pipeline consults the
//! environment afterwards.

use crate::error::StudyGenError;
use crate::pipeline::quality::QualityThresholds;
use std::fmt;

/// Model used when neither `STUDYGEN_MODEL` nor `OLLAMA_MODEL` is set.
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";

/// Ollama endpoint used when `OLLAMA_HOST` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Configuration for artifact extraction.
///
/// Built via [`ExtractionConfig::builder()`], [`ExtractionConfig::from_env()`]
/// or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use studygen::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("llama3.1:8b")
///     .generation_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "llama3.1:8b");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model identifier sent in every generate request. Default: `qwen2.5:7b`.
    pub model: String,

    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub base_url: String,

    /// Sampling temperature for flashcard and MCQ generation. Default: 0.2.
    ///
    /// Low temperature keeps the model close to the requested JSON layout.
    /// Syllabus structuring and chunk tagging send no temperature and use the
    /// model's own default.
    pub temperature: f32,

    /// Timeout for one artifact-generation call, in seconds. Default: 120.
    pub generation_timeout_secs: u64,

    /// Timeout for one chunk-tagging call, in seconds. Default: 30.
    pub tagging_timeout_secs: u64,

    /// Ceiling on the context string fed into flashcard/MCQ prompts, in
    /// characters. Default: 12 000. Longer context is truncated, never rejected.
    pub max_context_chars: usize,

    /// Ceiling on syllabus text fed into the structuring prompt. Default: 15 000.
    pub max_syllabus_chars: usize,

    /// Characters of each chunk shown to the tagging prompt. Default: 500.
    pub tagging_excerpt_chars: usize,

    /// Thresholds for the text quality gate.
    pub quality: QualityThresholds,

    /// Longest rendered edge, in pixels, for pages sent to vision OCR. Default: 2000.
    pub ocr_max_pixels: u32,

    /// Maximum tokens the vision model may produce per OCR page. Default: 4096.
    pub ocr_max_tokens: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.2,
            generation_timeout_secs: 120,
            tagging_timeout_secs: 30,
            max_context_chars: 12_000,
            max_syllabus_chars: 15_000,
            tagging_excerpt_chars: 500,
            quality: QualityThresholds::default(),
            ocr_max_pixels: 2000,
            ocr_max_tokens: 4096,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("generation_timeout_secs", &self.generation_timeout_secs)
            .field("tagging_timeout_secs", &self.tagging_timeout_secs)
            .field("max_context_chars", &self.max_context_chars)
            .field("max_syllabus_chars", &self.max_syllabus_chars)
            .field("quality", &self.quality)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the model and host taken from the environment.
    ///
    /// `STUDYGEN_MODEL` wins over `OLLAMA_MODEL`; empty values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let model = non_empty_var("STUDYGEN_MODEL").or_else(|| non_empty_var("OLLAMA_MODEL"));
        if let Some(model) = model {
            config.model = model;
        }
        if let Some(host) = non_empty_var("OLLAMA_HOST") {
            config.base_url = normalise_base_url(&host);
        }
        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Accept `host:port` as well as full URLs, and drop a trailing slash.
fn normalise_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.base_url = normalise_base_url(url.as_ref());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn generation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.generation_timeout_secs = secs;
        self
    }

    pub fn tagging_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tagging_timeout_secs = secs;
        self
    }

    pub fn max_context_chars(mut self, n: usize) -> Self {
        self.config.max_context_chars = n;
        self
    }

    pub fn max_syllabus_chars(mut self, n: usize) -> Self {
        self.config.max_syllabus_chars = n;
        self
    }

    pub fn tagging_excerpt_chars(mut self, n: usize) -> Self {
        self.config.tagging_excerpt_chars = n.max(1);
        self
    }

    pub fn quality(mut self, thresholds: QualityThresholds) -> Self {
        self.config.quality = thresholds;
        self
    }

    pub fn ocr_max_pixels(mut self, px: u32) -> Self {
        self.config.ocr_max_pixels = px.max(100);
        self
    }

    pub fn ocr_max_tokens(mut self, n: usize) -> Self {
        self.config.ocr_max_tokens = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, StudyGenError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(StudyGenError::InvalidConfig("model must not be empty".into()));
        }
        if c.generation_timeout_secs == 0 || c.tagging_timeout_secs == 0 {
            return Err(StudyGenError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_context_chars == 0 || c.max_syllabus_chars == 0 {
            return Err(StudyGenError::InvalidConfig(
                "context ceilings must be ≥ 1 character".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.quality.dup_thresh)
            || !(0.0..=1.0).contains(&c.quality.min_unique_ratio)
        {
            return Err(StudyGenError::InvalidConfig(format!(
                "quality ratios must be within 0–1, got dup_thresh={} min_unique_ratio={}",
                c.quality.dup_thresh, c.quality.min_unique_ratio
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_contract() {
        let c = ExtractionConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.generation_timeout_secs, 120);
        assert_eq!(c.tagging_timeout_secs, 30);
        assert_eq!(c.max_context_chars, 12_000);
        assert_eq!(c.quality.min_len, 50);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ExtractionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ExtractionConfig::builder()
            .generation_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeouts"));
    }

    #[test]
    fn builder_rejects_out_of_range_ratio() {
        let quality = QualityThresholds {
            dup_thresh: 1.5,
            ..QualityThresholds::default()
        };
        assert!(ExtractionConfig::builder().quality(quality).build().is_err());
    }

    #[test]
    fn base_url_normalisation() {
        assert_eq!(normalise_base_url("localhost:11434/"), "http://localhost:11434");
        assert_eq!(normalise_base_url("https://gpu.box:8443"), "https://gpu.box:8443");
    }
}
