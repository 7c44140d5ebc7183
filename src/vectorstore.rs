//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s. The index
/// structure behind a collection (brute force, HNSW, an external service)
/// is opaque to the pipeline.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection for vectors of the given dimensionality.
    /// No-op if the collection already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its chunks.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    ///
    /// The batch is applied atomically with respect to concurrent searches:
    /// a search never observes a partially written batch.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Delete chunks by their IDs from a collection.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Search for the `top_k` chunks most similar to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// The number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
