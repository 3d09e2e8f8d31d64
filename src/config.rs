use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    pub server: ServerConfig,
}

/// Corpus loading settings. All length thresholds are byte counts;
/// truncation never splits a UTF-8 code point.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory of `*.json` knowledge-base files.
    pub data_dir: PathBuf,
    /// Label prepended to every chunk's `source` field.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Corpus cache time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// String leaves shorter than this (trimmed) are not retrievable content.
    #[serde(default = "default_min_leaf_len")]
    pub min_leaf_len: usize,
    /// Shorter threshold applied to plain strings inside arrays.
    #[serde(default = "default_min_array_leaf_len")]
    pub min_array_leaf_len: usize,
    /// Chunk content is truncated to this many bytes.
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
    /// Assembled sections below this length are discarded.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    /// Maximum extracted keywords per chunk.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

fn default_collection() -> String {
    "FEDEPALMA".to_string()
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_min_leaf_len() -> usize {
    20
}
fn default_min_array_leaf_len() -> usize {
    10
}
fn default_max_content_len() -> usize {
    1500
}
fn default_min_content_len() -> usize {
    100
}
fn default_max_keywords() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Default result count for lexical search.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Hard cap on requested result counts.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Minimum normalized score for lexical results.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Result count requested from the vector index.
    #[serde(default = "default_vector_limit")]
    pub vector_limit: usize,
    /// Minimum cosine similarity for vector results.
    #[serde(default = "default_vector_threshold")]
    pub vector_threshold: f64,
    /// Wall-clock bound on the whole vector path (embed + remote search).
    #[serde(default = "default_vector_timeout_secs")]
    pub vector_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            max_limit: default_max_limit(),
            threshold: default_threshold(),
            vector_limit: default_vector_limit(),
            vector_threshold: default_vector_threshold(),
            vector_timeout_secs: default_vector_timeout_secs(),
        }
    }
}

fn default_limit() -> usize {
    3
}
fn default_max_limit() -> usize {
    10
}
fn default_threshold() -> f64 {
    0.2
}
fn default_vector_limit() -> usize {
    8
}
fn default_vector_threshold() -> f64 {
    0.3
}
fn default_vector_timeout_secs() -> u64 {
    4
}

/// Lexical scoring weights. Kept as configuration rather than literals so
/// tuning is a config change and tests can assert ordering properties
/// against explicit values.
#[derive(Debug, Deserialize, Clone)]
pub struct ScoringWeights {
    #[serde(default = "default_exact_title")]
    pub exact_title: f64,
    #[serde(default = "default_exact_content")]
    pub exact_content: f64,
    #[serde(default = "default_exact_source")]
    pub exact_source: f64,
    #[serde(default = "default_partial_title")]
    pub partial_title: f64,
    #[serde(default = "default_partial_content")]
    pub partial_content: f64,
    #[serde(default = "default_partial_source")]
    pub partial_source: f64,
    /// Added when a token occurs in the chunk's extracted keyword list.
    #[serde(default = "default_keyword_bonus")]
    pub keyword_bonus: f64,
    /// Flat bonus for tokens from the domain vocabulary.
    #[serde(default = "default_domain_bonus")]
    pub domain_bonus: f64,
    /// Multiplier for short acronym-like tokens (2 to 4 letters).
    #[serde(default = "default_acronym_multiplier")]
    pub acronym_multiplier: f64,
    /// Divisor in the coverage normalization:
    /// `min(raw * matched / (tokens * normalization), 1)`.
    #[serde(default = "default_normalization")]
    pub normalization: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_title: default_exact_title(),
            exact_content: default_exact_content(),
            exact_source: default_exact_source(),
            partial_title: default_partial_title(),
            partial_content: default_partial_content(),
            partial_source: default_partial_source(),
            keyword_bonus: default_keyword_bonus(),
            domain_bonus: default_domain_bonus(),
            acronym_multiplier: default_acronym_multiplier(),
            normalization: default_normalization(),
        }
    }
}

fn default_exact_title() -> f64 {
    10.0
}
fn default_exact_content() -> f64 {
    5.0
}
fn default_exact_source() -> f64 {
    3.0
}
fn default_partial_title() -> f64 {
    3.0
}
fn default_partial_content() -> f64 {
    2.0
}
fn default_partial_source() -> f64 {
    1.0
}
fn default_keyword_bonus() -> f64 {
    4.0
}
fn default_domain_bonus() -> f64 {
    2.0
}
fn default_acronym_multiplier() -> f64 {
    1.5
}
fn default_normalization() -> f64 {
    5.0
}

/// Context assembly settings. Budgets are byte counts; truncation never
/// splits a UTF-8 code point.
#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Byte budget for the assembled context block.
    #[serde(default = "default_max_context_len")]
    pub max_bytes: usize,
    /// A chunk is truncated into the remaining budget only if at least this
    /// many bytes are left.
    #[serde(default = "default_min_truncate_window")]
    pub min_truncate_window: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_context_len(),
            min_truncate_window: default_min_truncate_window(),
        }
    }
}

fn default_max_context_len() -> usize {
    8000
}
fn default_min_truncate_window() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Remote similarity-search endpoint. Vector search is skipped when unset.
    #[serde(default)]
    pub index_url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            index_url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Turns of prior conversation forwarded to the model.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            history_turns: default_history_turns(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f64 {
    0.7
}
fn default_history_turns() -> usize {
    5
}
fn default_completion_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.corpus.max_content_len == 0 {
        anyhow::bail!("corpus.max_content_len must be > 0");
    }
    if config.corpus.min_content_len >= config.corpus.max_content_len {
        anyhow::bail!("corpus.min_content_len must be < corpus.max_content_len");
    }

    if config.retrieval.limit == 0 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.threshold) {
        anyhow::bail!("retrieval.threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.vector_threshold) {
        anyhow::bail!("retrieval.vector_threshold must be in [0.0, 1.0]");
    }

    if config.scoring.normalization <= 0.0 {
        anyhow::bail!("scoring.normalization must be > 0");
    }

    if config.context.max_bytes == 0 {
        anyhow::bail!("context.max_bytes must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(config)
}
