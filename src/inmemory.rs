//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps collections in a `HashMap` behind a
//! `tokio::sync::RwLock`. Search is a brute-force cosine scan, which is
//! plenty for development, tests, and single-document corpora.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{AssistantError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// Compute the cosine similarity of two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A named collection: expected dimensionality plus chunks keyed by ID.
#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    chunks: HashMap<String, Chunk>,
}

/// An in-memory [`VectorStore`] using cosine similarity for search.
///
/// Upserts take the write lock for the whole batch, so concurrent searches
/// see either none or all of a batch, never part of one.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(name: &str) -> AssistantError {
    AssistantError::VectorStore {
        backend: BACKEND.to_string(),
        message: format!("collection '{name}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, chunks: HashMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(AssistantError::VectorStore {
                    backend: BACKEND.to_string(),
                    message: format!("chunk '{}' has no embedding", chunk.id),
                });
            }
            if entry.dimensions != 0 && chunk.embedding.len() != entry.dimensions {
                return Err(AssistantError::VectorStore {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "chunk '{}' has dimension {} but collection '{collection}' expects {}",
                        chunk.id,
                        chunk.embedding.len(),
                        entry.dimensions
                    ),
                });
            }
        }
        for chunk in chunks {
            entry.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            entry.chunks.remove(*id);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let entry = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<SearchResult> = entry
            .chunks
            .values()
            .map(|chunk| SearchResult {
                score: cosine_similarity(&chunk.embedding, embedding),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let entry = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(entry.chunks.len())
    }
}
