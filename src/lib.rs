//! # rag-assistant
//!
//! Retrieval-Augmented-Generation chat assistant with conversational history.
//!
//! ## Overview
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! vector store. Each chat turn then runs one request/response cycle:
//!
//! 1. Rewrite the user input into a standalone query using the session
//!    history ([`QueryReformulator`]).
//! 2. Retrieve the top-k chunks above a similarity threshold
//!    ([`RetrievalPipeline`]).
//! 3. Generate an answer constrained to the retrieved context
//!    ([`AnswerGenerator`]).
//! 4. Append both turns to the session history.
//!
//! The [`RagAssistant`] orchestrator owns retry policy, per-call timeouts,
//! per-session turn serialization, and lifecycle events. Embedding models,
//! text-generation models, and the vector store sit behind traits and are
//! swappable without touching the orchestrator.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rag_assistant::{
//!     AssistantConfig, InMemoryVectorStore, MockEmbeddingProvider, MockTextGenerator,
//!     RagAssistant, RecursiveChunker, RetrievalPipeline,
//! };
//!
//! # async fn run() -> rag_assistant::Result<()> {
//! let config = AssistantConfig::builder().chunk_size(1000).chunk_overlap(200).build()?;
//!
//! let pipeline = Arc::new(
//!     RetrievalPipeline::builder()
//!         .config(config.clone())
//!         .embedding_provider(Arc::new(MockEmbeddingProvider::default()))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .chunker(Arc::new(RecursiveChunker::new(1000, 200)))
//!         .build()?,
//! );
//!
//! let assistant = RagAssistant::builder()
//!     .config(config)
//!     .pipeline(pipeline)
//!     .generator(Arc::new(MockTextGenerator::new()))
//!     .build()?;
//!
//! assistant.init().await?;
//! assistant.ingest_text("products", "Product A costs $10. Product B costs $20.").await?;
//!
//! let outcome = assistant.chat("session-1", "How much is Product A?").await?;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `openai` — embedding and chat adapters for the OpenAI API
//! - `ollama` — embedding and chat adapters for a local Ollama server
//! - `repl` — the `rag-chat` interactive terminal binary

pub mod answer;
pub mod assistant;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod event;
pub mod generation;
pub mod inmemory;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod reformulate;
pub mod session;
pub mod vectorstore;

pub use answer::AnswerGenerator;
pub use assistant::{RagAssistant, RagAssistantBuilder, TurnOutcome};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{AssistantConfig, AssistantConfigBuilder, ReformulationFallback};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{AssistantError, Result};
pub use event::{EventReceiver, EventSender, TurnEvent};
pub use generation::{GenerationOptions, Message, Role, TextGenerator};
pub use inmemory::{cosine_similarity, InMemoryVectorStore};
pub use mock::{MockEmbeddingProvider, MockTextGenerator};
pub use pipeline::{RetrievalPipeline, RetrievalPipelineBuilder};
pub use reformulate::QueryReformulator;
pub use session::{Session, SessionRegistry, Turn};
pub use vectorstore::VectorStore;
