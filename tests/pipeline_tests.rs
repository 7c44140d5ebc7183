//! Ingestion and retrieval contract tests for the pipeline and the
//! in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use rag_assistant::chunking::FixedSizeChunker;
use rag_assistant::config::AssistantConfig;
use rag_assistant::document::{Chunk, Document};
use rag_assistant::embedding::EmbeddingProvider;
use rag_assistant::error::{AssistantError, Result};
use rag_assistant::inmemory::InMemoryVectorStore;
use rag_assistant::mock::MockEmbeddingProvider;
use rag_assistant::pipeline::RetrievalPipeline;
use rag_assistant::vectorstore::VectorStore;

fn build_pipeline(config: AssistantConfig) -> RetrievalPipeline {
    let chunker = FixedSizeChunker::new(config.chunk_size, config.chunk_overlap);
    RetrievalPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(256)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .chunker(Arc::new(chunker))
        .build()
        .unwrap()
}

fn small_config() -> AssistantConfig {
    AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(4)
        .score_threshold(0.0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn ingest_rejects_empty_document() {
    let pipeline = build_pipeline(small_config());
    pipeline.create_collection("docs").await.unwrap();

    let err = pipeline.ingest("docs", &Document::new("d", "   ")).await;
    assert!(matches!(err, Err(AssistantError::Ingestion(_))));
}

#[tokio::test]
async fn ingest_rejects_degenerate_overlap() {
    // Bypass the config builder to reach the pipeline's own guard.
    let config = AssistantConfig { chunk_size: 10, chunk_overlap: 10, ..AssistantConfig::default() };
    let pipeline = build_pipeline(config);
    pipeline.create_collection("docs").await.unwrap();

    let err = pipeline.ingest("docs", &Document::new("d", "some text")).await;
    assert!(matches!(err, Err(AssistantError::Ingestion(_))));
}

/// An embedding provider that always fails.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AssistantError::Embedding {
            provider: "failing".to_string(),
            message: "provider unavailable".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        4
    }
}

#[tokio::test]
async fn embedding_failure_aborts_ingestion_without_partial_writes() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = RetrievalPipeline::builder()
        .config(small_config())
        .embedding_provider(Arc::new(FailingEmbedder))
        .vector_store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .chunker(Arc::new(FixedSizeChunker::new(20, 5)))
        .build()
        .unwrap();
    pipeline.create_collection("docs").await.unwrap();

    let err = pipeline.ingest("docs", &Document::new("d", "Product A costs $10.")).await;
    assert!(matches!(err, Err(AssistantError::Embedding { .. })));
    assert_eq!(store.count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn retrieve_rejects_zero_k() {
    let pipeline = build_pipeline(small_config());
    pipeline.create_collection("docs").await.unwrap();

    let err = pipeline.retrieve_with("docs", "anything", 0, 0.0).await;
    assert!(matches!(err, Err(AssistantError::InvalidArgument(_))));
}

#[tokio::test]
async fn retrieve_filters_by_threshold_and_sorts() {
    let pipeline = build_pipeline(small_config());
    pipeline.create_collection("docs").await.unwrap();
    pipeline
        .ingest("docs", &Document::new("products", "Product A costs $10. Product B costs $20."))
        .await
        .unwrap();

    let results = pipeline.retrieve_with("docs", "How much is Product A?", 4, 0.1).await.unwrap();
    assert!(!results.is_empty());
    for result in &results {
        assert!(result.score >= 0.1);
    }
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
}

#[tokio::test]
async fn retrieve_returns_empty_when_nothing_meets_threshold() {
    let pipeline = build_pipeline(small_config());
    pipeline.create_collection("docs").await.unwrap();
    pipeline
        .ingest("docs", &Document::new("products", "Product A costs $10."))
        .await
        .unwrap();

    // An impossible threshold: empty result, not an error.
    let results = pipeline.retrieve_with("docs", "completely unrelated words", 4, 0.99).await;
    assert!(results.unwrap().is_empty());
}

// ── Store-level search ordering property ───────────────────────────

fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-6 {
            return None;
        }
        for value in &mut v {
            *value /= norm;
        }
        Some(v)
    })
}

fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", arb_normalized_embedding(dim)).prop_map(|(id, embedding)| Chunk {
        text: format!("text for {id}"),
        id,
        embedding,
        metadata: HashMap::new(),
        document_id: "doc".to_string(),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Search results come back ordered by descending cosine similarity,
    /// bounded by `top_k` and by the number of stored chunks.
    #[test]
    fn search_results_ordered_and_bounded(
        chunks in proptest::collection::vec(arb_chunk(8), 1..20),
        query in arb_normalized_embedding(8),
        top_k in 1usize..25,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (results, unique_count) = rt.block_on(async {
            let store = InMemoryVectorStore::new();
            store.create_collection("test", 8).await.unwrap();

            // Deduplicate by id so upserts don't overwrite each other.
            let mut deduped: HashMap<String, Chunk> = HashMap::new();
            for chunk in &chunks {
                deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
            }
            let unique: Vec<Chunk> = deduped.into_values().collect();
            let count = unique.len();

            store.upsert("test", &unique).await.unwrap();
            (store.search("test", &query, top_k).await.unwrap(), count)
        });

        prop_assert!(results.len() <= top_k);
        prop_assert!(results.len() <= unique_count);
        for window in results.windows(2) {
            prop_assert!(
                window[0].score >= window[1].score,
                "results not in descending order: {} < {}",
                window[0].score,
                window[1].score,
            );
        }
    }
}
