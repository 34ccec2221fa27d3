//! Application state for the Q&A server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{EmbeddingBackend, LlmBackend, RagConfig};
use crate::error::Result;
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{ArxivClient, IngestionService};
use crate::providers::{
    EmbeddingProvider, HashingEmbedder, LlmProvider, OllamaEmbedder, OllamaLlm, OpenAiChat,
};
use crate::retrieval::{
    Bm25Params, LexicalRetriever, RetrievalService, SelectionService, SimilarityRetriever,
};
use crate::storage::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// SQLite store
    db: Database,
    /// Embedding provider (Ollama, ONNX, or hashing)
    embedding_provider: Arc<dyn EmbeddingProvider>,
    /// Chat LLM (OpenAI or Ollama)
    llm_provider: Arc<dyn LlmProvider>,
    ingestion: IngestionService,
    retrieval: RetrievalService,
    selection: SelectionService,
    synthesizer: AnswerSynthesizer,
    arxiv: ArxivClient,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing Q&A application state...");

        let db = Database::open(&config.database.path)?;
        tracing::info!("Database opened at {}", config.database.path.display());

        let embedding_provider: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Ollama => {
                tracing::info!(
                    "Using Ollama embeddings ({} at {})",
                    config.embeddings.model,
                    config.embeddings.ollama_url
                );
                Arc::new(OllamaEmbedder::new(&config.embeddings)?)
            }
            EmbeddingBackend::Onnx => {
                #[cfg(feature = "onnx")]
                {
                    Arc::new(crate::providers::OnnxEmbedder::new(&config.embeddings).await?)
                }
                #[cfg(not(feature = "onnx"))]
                {
                    return Err(crate::error::Error::Config(
                        "ONNX embeddings require the `onnx` feature".to_string(),
                    ));
                }
            }
            EmbeddingBackend::Hashing => {
                tracing::info!("Using hashing embeddings");
                Arc::new(HashingEmbedder::new())
            }
        };

        let llm_provider: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::OpenAi => Arc::new(OpenAiChat::new(&config.llm)?),
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        };
        tracing::info!(
            "Using {} LLM ({})",
            llm_provider.name(),
            llm_provider.model()
        );

        Self::from_parts(config, db, embedding_provider, llm_provider)
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: RagConfig,
        db: Database,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm_provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let embed_timeout = config.embeddings.timeout();

        let ingestion = IngestionService::new(
            db.clone(),
            Arc::clone(&embedding_provider),
            embed_timeout,
            config.ingestion.batch_concurrency,
        );
        let retrieval = RetrievalService::new(
            SimilarityRetriever::new(db.clone(), Arc::clone(&embedding_provider), embed_timeout),
            LexicalRetriever::new(db.clone(), Bm25Params::from(&config.retrieval)),
        );
        let selection = SelectionService::new(db.clone());
        let synthesizer =
            AnswerSynthesizer::new(db.clone(), Arc::clone(&llm_provider), config.llm.timeout());
        let arxiv = ArxivClient::new(&config.arxiv)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                embedding_provider,
                llm_provider,
                ingestion,
                retrieval,
                selection,
                synthesizer,
                arxiv,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the database
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get embedding provider
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedding_provider
    }

    /// Get LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    pub fn ingestion(&self) -> &IngestionService {
        &self.inner.ingestion
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.inner.retrieval
    }

    pub fn selection(&self) -> &SelectionService {
        &self.inner.selection
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.inner.synthesizer
    }

    pub fn arxiv(&self) -> &ArxivClient {
        &self.inner.arxiv
    }

    /// top_k for requests that omit it
    pub fn default_top_k(&self) -> usize {
        self.inner.config.retrieval.default_top_k
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
