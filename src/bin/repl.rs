//! Interactive terminal chat over an ingested text file.
//!
//! Runs with deterministic mock providers by default (no API keys or
//! servers needed); build with `--features repl,ollama` to chat against a
//! local Ollama server instead.
//!
//! ```text
//! cargo run --bin rag-chat --features repl -- --file product-data.txt
//! ```
//!
//! Commands inside the loop: `:clear` resets the session history, `:quit`
//! exits. Core errors are rendered as `Error: <message>` and never crash
//! the loop.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rag_assistant::{
    AssistantConfig, Document, InMemoryVectorStore, RagAssistant, RecursiveChunker,
    RetrievalPipeline,
};

#[derive(Parser, Debug)]
#[command(name = "rag-chat", about = "Chat with a document over a RAG pipeline")]
struct Args {
    /// Text file to ingest at startup.
    #[arg(long)]
    file: Option<String>,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    /// Maximum number of chunks retrieved per question.
    #[arg(long, default_value_t = 4)]
    top_k: usize,

    /// Minimum similarity score for retrieved chunks.
    #[arg(long, default_value_t = 0.3)]
    score_threshold: f32,

    /// Session identifier.
    #[arg(long, default_value = "default")]
    session: String,

    /// Ollama model to use when built with the `ollama` feature.
    #[arg(long, default_value = "llama3.2")]
    model: String,
}

#[cfg(feature = "ollama")]
fn providers(
    args: &Args,
) -> (Arc<dyn rag_assistant::EmbeddingProvider>, Arc<dyn rag_assistant::TextGenerator>) {
    use rag_assistant::ollama::{OllamaChatGenerator, OllamaEmbeddingProvider};
    println!("Using Ollama model '{}' at http://localhost:11434", args.model);
    (
        Arc::new(OllamaEmbeddingProvider::new(args.model.clone(), 3072)),
        Arc::new(OllamaChatGenerator::new(args.model.clone())),
    )
}

#[cfg(not(feature = "ollama"))]
fn providers(
    _args: &Args,
) -> (Arc<dyn rag_assistant::EmbeddingProvider>, Arc<dyn rag_assistant::TextGenerator>) {
    use rag_assistant::{MockEmbeddingProvider, MockTextGenerator};
    println!("Using mock providers (build with --features repl,ollama for real models)");
    (Arc::new(MockEmbeddingProvider::default()), Arc::new(MockTextGenerator::new()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = AssistantConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .top_k(args.top_k)
        .score_threshold(args.score_threshold)
        .build()?;

    let (embedding_provider, generator) = providers(&args);
    let pipeline = Arc::new(
        RetrievalPipeline::builder()
            .config(config.clone())
            .embedding_provider(embedding_provider)
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(Arc::new(RecursiveChunker::new(args.chunk_size, args.chunk_overlap)))
            .build()?,
    );

    let assistant = RagAssistant::builder()
        .config(config)
        .pipeline(pipeline)
        .generator(generator)
        .build()?;
    assistant.init().await?;

    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let document = Document::new(path.as_str(), text).with_source_uri(path.as_str());
        let chunks = assistant.ingest_document(&document).await?;
        println!("Ingested {path} ({} chunks)", chunks.len());
    } else {
        println!("No --file given; the assistant has an empty knowledge base.");
    }

    println!("Ask a question (:clear resets history, :quit exits)");
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match line {
                    ":quit" | ":q" => break,
                    ":clear" => {
                        assistant.sessions().clear(&args.session).await;
                        println!("History cleared.");
                    }
                    input => match assistant.chat(&args.session, input).await {
                        Ok(outcome) => println!("{}", outcome.answer),
                        // All core errors surface here as text; the loop goes on.
                        Err(e) => println!("Error: {e}"),
                    },
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
