//! Retrieval pipeline: ingest documents and retrieve context for queries.
//!
//! [`RetrievalPipeline`] composes a [`Chunker`], an [`EmbeddingProvider`],
//! and a [`VectorStore`]. Ingestion runs chunk → embed → store; retrieval
//! runs embed → search → threshold-filter. Construct one via
//! [`RetrievalPipeline::builder()`].

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{error, info};

use crate::chunking::Chunker;
use crate::config::AssistantConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{AssistantError, Result};
use crate::vectorstore::VectorStore;

/// Ingest-and-retrieve pipeline over a vector store.
pub struct RetrievalPipeline {
    config: AssistantConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RetrievalPipeline {
    /// Create a new [`RetrievalPipelineBuilder`].
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// The vector store backing this pipeline.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection sized for the configured embedding provider.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await
    }

    /// Delete a named collection.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// Returns the chunks that were stored, with embeddings attached. The
    /// store is only written after every chunk embedded successfully, so a
    /// failed ingestion never leaves a document half-indexed.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::Ingestion`] if the document text is empty or the
    ///   chunking parameters are degenerate (`chunk_overlap >= chunk_size`).
    /// - [`AssistantError::Embedding`] if embedding fails or times out.
    /// - [`AssistantError::VectorStore`] if the upsert fails.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(AssistantError::Ingestion(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if document.text.trim().is_empty() {
            return Err(AssistantError::Ingestion(format!(
                "document '{}' has no text",
                document.id
            )));
        }

        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Err(AssistantError::Ingestion(format!(
                "document '{}' produced no chunks",
                document.id
            )));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = timeout(self.config.timeout(), self.embedding_provider.embed_batch(&texts))
            .await
            .map_err(|_| AssistantError::Embedding {
                provider: self.embedding_provider.name().to_string(),
                message: format!("embedding timed out after {} ms", self.config.timeout_ms),
            })?
            .inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            })?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(collection, &chunks).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
        })?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest multiple documents, stopping at the first failure.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let chunks = self.ingest(collection, document).await?;
            all_chunks.extend(chunks);
        }
        Ok(all_chunks)
    }

    /// Ingest raw text under a document ID.
    pub async fn ingest_text(
        &self,
        collection: &str,
        document_id: &str,
        text: &str,
    ) -> Result<Vec<Chunk>> {
        self.ingest(collection, &Document::new(document_id, text)).await
    }

    /// Retrieve context for a query using the configured `top_k` and
    /// `score_threshold`.
    pub async fn retrieve(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.retrieve_with(collection, query, self.config.top_k, self.config.score_threshold).await
    }

    /// Retrieve the top `k` chunks whose similarity to `query` is at least
    /// `score_threshold`, ordered by descending score.
    ///
    /// An empty result is `Ok`; it means no stored chunk met the threshold.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::InvalidArgument`] if `k == 0`.
    /// - [`AssistantError::RetrievalTimeout`] if the query embedding or the
    ///   store search exceeds the configured timeout.
    /// - [`AssistantError::Embedding`] / [`AssistantError::VectorStore`] for
    ///   provider and store failures.
    pub async fn retrieve_with(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(AssistantError::InvalidArgument("k must be greater than zero".to_string()));
        }

        let deadline = self.config.timeout();
        let timed_out = || AssistantError::RetrievalTimeout { timeout_ms: self.config.timeout_ms };

        let query_embedding = timeout(deadline, self.embedding_provider.embed(query))
            .await
            .map_err(|_| timed_out())?
            .inspect_err(|e| error!(error = %e, "query embedding failed"))?;

        let results = timeout(deadline, self.vector_store.search(collection, &query_embedding, k))
            .await
            .map_err(|_| timed_out())?
            .inspect_err(|e| error!(collection, error = %e, "vector store search failed"))?;

        let mut hits: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= score_threshold).collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        info!(result_count = hits.len(), "retrieval completed");
        Ok(hits)
    }
}

/// Builder for constructing a [`RetrievalPipeline`]. All fields are required.
#[derive(Default)]
pub struct RetrievalPipelineBuilder {
    config: Option<AssistantConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RetrievalPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RetrievalPipeline`], validating that all fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if any field is missing.
    pub fn build(self) -> Result<RetrievalPipeline> {
        let config = self
            .config
            .ok_or_else(|| AssistantError::Config("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| AssistantError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| AssistantError::Config("vector_store is required".to_string()))?;
        let chunker = self
            .chunker
            .ok_or_else(|| AssistantError::Config("chunker is required".to_string()))?;

        Ok(RetrievalPipeline { config, embedding_provider, vector_store, chunker })
    }
}
