//! Configuration for the Q&A service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::EMBEDDING_DIM;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Upper bound for `embeddings.max_retries`; backoff doubles per attempt
pub const MAX_EMBEDDING_RETRIES: u32 = 10;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// SQLite database configuration
    pub database: DatabaseConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chat LLM configuration
    pub llm: LlmConfig,
    /// Retrieval tuning
    pub retrieval: RetrievalConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
    /// arXiv fetcher configuration
    pub arxiv: ArxivConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Override selected fields from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QNA_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("QNA_RAG_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(path) = std::env::var("QNA_RAG_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.embeddings.ollama_url = url.clone();
            if self.llm.backend == LlmBackend::Ollama {
                self.llm.base_url = url;
            }
        }
        if let Some(backend) = std::env::var("QNA_RAG_LLM_BACKEND")
            .ok()
            .and_then(|b| LlmBackend::parse(&b))
        {
            self.llm.backend = backend;
        }
        if let Some(backend) = std::env::var("QNA_RAG_EMBEDDING_BACKEND")
            .ok()
            .and_then(|b| EmbeddingBackend::parse(&b))
        {
            self.embeddings.backend = backend;
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions != EMBEDDING_DIM {
            return Err(Error::Config(format!(
                "embeddings.dimensions must be {}, got {}",
                EMBEDDING_DIM, self.embeddings.dimensions
            )));
        }
        if self.llm.backend == LlmBackend::OpenAi && self.llm.api_key.is_none() {
            return Err(Error::Config(
                "llm.backend = \"openai\" requires llm.api_key or OPENAI_API_KEY".to_string(),
            ));
        }
        if self.embeddings.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        if self.embeddings.max_retries > MAX_EMBEDDING_RETRIES {
            return Err(Error::Config(format!(
                "embeddings.max_retries must be at most {}, got {}",
                MAX_EMBEDDING_RETRIES, self.embeddings.max_retries
            )));
        }
        if self.ingestion.batch_concurrency == 0 {
            return Err(Error::Config(
                "ingestion.batch_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qna-rag")
            .join("qna.db");
        Self { path }
    }
}

/// Which embedding provider to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embeddings` (all-minilm)
    #[default]
    Ollama,
    /// In-process ONNX all-MiniLM-L6-v2 (requires the `onnx` feature)
    Onnx,
    /// Deterministic feature hashing, no model needed
    Hashing,
}

impl EmbeddingBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "onnx" => Some(Self::Onnx),
            "hashing" => Some(Self::Hashing),
            _ => None,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider backend
    pub backend: EmbeddingBackend,
    /// Model name (Ollama tag or sentence-transformers repo name)
    pub model: String,
    /// Embedding dimensions (must be 384)
    pub dimensions: usize,
    /// Ollama base URL (Ollama backend)
    pub ollama_url: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Retries for failed Ollama embedding requests during ingestion
    pub max_retries: u32,
    /// Cache directory for ONNX model files
    pub cache_dir: PathBuf,
    /// Maximum sequence length (ONNX backend)
    pub max_length: usize,
    /// Batch size (ONNX backend)
    pub batch_size: usize,
}

impl EmbeddingConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            model: "all-minilm".to_string(),
            dimensions: EMBEDDING_DIM,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: 30,
            max_retries: 2,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("qna-rag")
                .join("models"),
            max_length: 256,
            batch_size: 32,
        }
    }
}

/// Which chat LLM to call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI-compatible `/v1/chat/completions`
    #[serde(rename = "openai")]
    OpenAi,
    /// Ollama `/api/chat`
    #[default]
    Ollama,
}

impl LlmBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Chat LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider backend
    pub backend: LlmBackend,
    /// Base URL (Ollama host, or OpenAI-compatible API root)
    pub base_url: String,
    /// API key (OpenAI backend)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens in the answer
    pub max_tokens: usize,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API root for the configured backend. An OpenAI backend left on the
    /// Ollama default talks to api.openai.com.
    pub fn endpoint(&self) -> &str {
        match self.backend {
            LlmBackend::OpenAi if self.base_url == DEFAULT_OLLAMA_URL => DEFAULT_OPENAI_URL,
            _ => &self.base_url,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            api_key: None,
            model: "llama3.2:3b".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 120,
        }
    }
}

/// Retrieval tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// top_k used when a request omits it
    pub default_top_k: usize,
    /// BM25 term-frequency saturation
    pub bm25_k1: f64,
    /// BM25 length normalization
    pub bm25_b: f64,
    /// Floor for negative IDF values, as a fraction of the mean IDF
    pub bm25_epsilon: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            bm25_epsilon: 0.25,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Documents embedded concurrently within one batch request
    pub batch_concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: num_cpus::get().clamp(1, 4),
        }
    }
}

/// arXiv fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    /// Atom query endpoint
    pub base_url: String,
    /// Papers fetched when a request omits `limit`
    pub default_limit: usize,
    /// Upper bound on papers per request
    pub max_results_cap: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org/api/query".to_string(),
            default_limit: 5,
            max_results_cap: 50,
            timeout_secs: 30,
        }
    }
}
