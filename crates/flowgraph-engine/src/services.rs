use std::sync::Arc;
use std::time::Duration;

use flowgraph_core::{EmbeddingProvider, FileExtractor, LlmProvider, PlainTextFileExtractor, RerankProvider, ToolRegistry};
use flowgraph_data::DataStore;
use flowgraph_storage::Database;
use flowgraph_vector::VectorStore;

use crate::retry::RetryPolicy;

/// Everything an action handler needs besides the step and the envelope.
/// Cloned per request (cheap: everything inside is an `Arc` or a pool handle).
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmProvider>,
    pub embeddings: Option<Arc<dyn EmbeddingProvider>>,
    pub rerank: Arc<dyn RerankProvider>,
    pub tools: ToolRegistry,
    pub storage: Database,
    pub data: DataStore,
    pub vectors: VectorStore,
    pub http: reqwest::Client,
    pub default_model: String,
    pub default_embedding_model: String,
    pub http_retry: RetryPolicy,
    /// Consulted by callers ahead of a `file_ingestion`/`file_storage` resume,
    /// never by the driver loop itself: resume's `value` is already extracted
    /// text by the time it reaches `Engine::resume`.
    pub file_extractor: Arc<dyn FileExtractor>,
}

impl Services {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Option<Arc<dyn EmbeddingProvider>>,
        rerank: Arc<dyn RerankProvider>,
        tools: ToolRegistry,
        storage: Database,
        data: DataStore,
        vectors: VectorStore,
        default_model: impl Into<String>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            embeddings,
            rerank,
            tools,
            storage,
            data,
            vectors,
            http: reqwest::Client::builder().timeout(http_timeout).build().unwrap_or_default(),
            default_model: default_model.into(),
            default_embedding_model: "text-embedding-3-small".to_string(),
            http_retry: RetryPolicy::exponential(),
            file_extractor: Arc::new(PlainTextFileExtractor),
        }
    }

    /// Swaps in a richer extractor (PDF/DOCX/OCR) without touching the rest
    /// of the bundle.
    pub fn with_file_extractor(mut self, file_extractor: Arc<dyn FileExtractor>) -> Self {
        self.file_extractor = file_extractor;
        self
    }
}
