//! End-to-end chat turn tests with deterministic mock providers.

use std::sync::Arc;
use std::time::Duration;

use rag_assistant::{
    AssistantConfig, AssistantError, FixedSizeChunker, InMemoryVectorStore, MockEmbeddingProvider,
    MockTextGenerator, RagAssistant, ReformulationFallback, RetrievalPipeline, Role, TurnEvent,
    event,
};

const PRODUCT_DATA: &str = "Product A costs $10. Product B costs $20.";

fn product_config() -> AssistantConfig {
    AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(1)
        .score_threshold(0.0)
        .max_retries(0)
        .build()
        .unwrap()
}

fn build_assistant(config: AssistantConfig, generator: Arc<MockTextGenerator>) -> RagAssistant {
    let chunker = FixedSizeChunker::new(config.chunk_size, config.chunk_overlap);
    let pipeline = Arc::new(
        RetrievalPipeline::builder()
            .config(config.clone())
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(512)))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(Arc::new(chunker))
            .build()
            .unwrap(),
    );
    RagAssistant::builder().config(config).pipeline(pipeline).generator(generator).build().unwrap()
}

async fn seeded_assistant(
    config: AssistantConfig,
    generator: Arc<MockTextGenerator>,
) -> RagAssistant {
    let assistant = build_assistant(config, generator);
    assistant.init().await.unwrap();
    assistant.ingest_text("products", PRODUCT_DATA).await.unwrap();
    assistant
}

#[tokio::test]
async fn product_question_retrieves_first_chunk() {
    let generator = Arc::new(MockTextGenerator::new().with_reply("Product A costs $10."));
    let assistant = seeded_assistant(product_config(), Arc::clone(&generator)).await;

    let outcome = assistant.chat("s1", "How much is Product A?").await.unwrap();

    assert_eq!(outcome.answer, "Product A costs $10.");
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].chunk.text, "Product A costs $10.");
    assert_eq!(outcome.sources[0].chunk.id, "products_0");
    // Empty history: the raw input was used as the query, with no model call
    // spent on reformulation.
    assert_eq!(outcome.standalone_query, "How much is Product A?");
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn follow_up_is_reformulated_into_standalone_query() {
    let generator = Arc::new(
        MockTextGenerator::new()
            .with_reply("Product A costs $10.")
            .with_reply("How much does Product B cost?")
            .with_reply("Product B costs $20."),
    );
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(2)
        .score_threshold(0.0)
        .max_retries(0)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, Arc::clone(&generator)).await;

    assistant.chat("s1", "Tell me about Product A").await.unwrap();
    let outcome = assistant.chat("s1", "What about B?").await.unwrap();

    assert!(
        outcome.standalone_query.contains("Product B"),
        "expected a standalone query about Product B, got: {}",
        outcome.standalone_query
    );
    assert_eq!(outcome.answer, "Product B costs $20.");

    // The reformulation request carried the prior conversation.
    let requests = generator.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].iter().any(|m| m.content.contains("Tell me about Product A")));

    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 4);
}

#[tokio::test]
async fn empty_retrieval_returns_configured_reply_without_model_call() {
    let generator = Arc::new(MockTextGenerator::new());
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(4)
        .score_threshold(0.99)
        .max_retries(0)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, Arc::clone(&generator)).await;

    let outcome = assistant.chat("s1", "What is the airspeed of a swallow?").await.unwrap();

    assert!(outcome.sources.is_empty());
    assert_eq!(outcome.answer, "I don't have that information.");
    assert_eq!(generator.call_count(), 0);

    // The turn still succeeded, so it was committed to history.
    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 2);
}

#[tokio::test]
async fn generation_failure_leaves_history_unchanged() {
    let generator = Arc::new(MockTextGenerator::new().with_failure("model exploded"));
    let assistant = seeded_assistant(product_config(), generator).await;

    let err = assistant.chat("s1", "How much is Product A?").await;
    assert!(matches!(err, Err(AssistantError::Generation(_))));

    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 0);
}

#[tokio::test]
async fn transient_generation_failure_is_retried() {
    let generator = Arc::new(
        MockTextGenerator::new().with_failure("transient").with_reply("recovered"),
    );
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(1)
        .score_threshold(0.0)
        .max_retries(1)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, Arc::clone(&generator)).await;

    let outcome = assistant.chat("s1", "How much is Product A?").await.unwrap();
    assert_eq!(outcome.answer, "recovered");
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn reformulation_failure_falls_back_to_raw_input() {
    let generator = Arc::new(
        MockTextGenerator::new()
            .with_reply("Product A costs $10.")
            .with_failure("reformulation down")
            .with_reply("answered from raw input"),
    );
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(2)
        .score_threshold(0.0)
        .max_retries(0)
        .reformulation_fallback(ReformulationFallback::UseRawInput)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, generator).await;

    assistant.chat("s1", "Tell me about Product A").await.unwrap();
    let outcome = assistant.chat("s1", "What about B?").await.unwrap();

    assert_eq!(outcome.standalone_query, "What about B?");
    assert_eq!(outcome.answer, "answered from raw input");
}

#[tokio::test]
async fn reformulation_failure_fails_turn_under_strict_policy() {
    let generator = Arc::new(
        MockTextGenerator::new()
            .with_reply("Product A costs $10.")
            .with_failure("reformulation down"),
    );
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(2)
        .score_threshold(0.0)
        .max_retries(0)
        .reformulation_fallback(ReformulationFallback::Fail)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, generator).await;

    assistant.chat("s1", "Tell me about Product A").await.unwrap();
    let err = assistant.chat("s1", "What about B?").await;
    assert!(matches!(err, Err(AssistantError::Reformulation(_))));

    // The failed turn appended nothing.
    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 2);
}

#[tokio::test]
async fn slow_generation_times_out() {
    let generator =
        Arc::new(MockTextGenerator::new().with_latency(Duration::from_millis(200)));
    let config = AssistantConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(1)
        .score_threshold(0.0)
        .timeout_ms(30)
        .max_retries(0)
        .build()
        .unwrap();
    let assistant = seeded_assistant(config, generator).await;

    let err = assistant.chat("s1", "How much is Product A?").await;
    match err {
        Err(AssistantError::Generation(message)) => {
            assert!(message.contains("timed out"), "unexpected message: {message}");
        }
        other => panic!("expected a generation timeout, got {other:?}"),
    }

    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 0);
}

#[tokio::test]
async fn dropped_turn_appends_nothing_and_releases_the_session() {
    let generator = Arc::new(
        MockTextGenerator::new()
            .with_reply("answered after the drop")
            .with_latency(Duration::from_millis(100)),
    );
    let assistant = seeded_assistant(product_config(), generator).await;

    // Abandon the turn mid-generation by dropping its future.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        assistant.chat("s1", "How much is Product A?"),
    )
    .await;
    assert!(abandoned.is_err());

    // History commits are the last step of a turn, so the dropped turn
    // left nothing behind.
    let session = assistant.sessions().get("s1").await.unwrap();
    assert_eq!(session.len().await, 0);

    // The turn gate was released along with the dropped future: the next
    // turn on the same session runs to completion and commits.
    let outcome = assistant.chat("s1", "How much is Product A?").await.unwrap();
    assert_eq!(outcome.answer, "answered after the drop");
    assert_eq!(session.len().await, 2);
}

#[tokio::test]
async fn blank_input_is_rejected() {
    let generator = Arc::new(MockTextGenerator::new());
    let assistant = build_assistant(product_config(), generator);

    let err = assistant.chat("s1", "   ").await;
    assert!(matches!(err, Err(AssistantError::InvalidArgument(_))));
}

#[tokio::test]
async fn concurrent_turns_on_one_session_commit_in_submission_order() {
    let generator = Arc::new(
        MockTextGenerator::new()
            .with_reply("first answer")
            .with_reply("standalone second question")
            .with_reply("second answer")
            .with_latency(Duration::from_millis(30)),
    );
    let assistant = Arc::new(seeded_assistant(product_config(), generator).await);

    let first = {
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move { assistant.chat("shared", "first question").await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move { assistant.chat("shared", "second question").await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let session = assistant.sessions().get("shared").await.unwrap();
    let history = session.history().await;
    let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(
        contents,
        ["first question", "first answer", "second question", "second answer"]
    );
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn lifecycle_events_are_emitted_in_order() {
    let (tx, mut rx) = event::channel();
    let generator = Arc::new(MockTextGenerator::new().with_reply("Product A costs $10."));
    let chunker = FixedSizeChunker::new(20, 5);
    let config = product_config();
    let pipeline = Arc::new(
        RetrievalPipeline::builder()
            .config(config.clone())
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(512)))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(Arc::new(chunker))
            .build()
            .unwrap(),
    );
    let assistant = RagAssistant::builder()
        .config(config)
        .pipeline(pipeline)
        .generator(generator)
        .events(tx)
        .build()
        .unwrap();
    assistant.init().await.unwrap();
    assistant.ingest_text("products", PRODUCT_DATA).await.unwrap();

    assistant.chat("s1", "How much is Product A?").await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], TurnEvent::Started { .. }));
    assert!(matches!(events[1], TurnEvent::QueryReformulated { .. }));
    assert!(matches!(events[2], TurnEvent::ContextRetrieved { result_count: 1, .. }));
    assert!(matches!(events[3], TurnEvent::Completed { .. }));
}

#[tokio::test]
async fn failed_turn_emits_failed_event() {
    let (tx, mut rx) = event::channel();
    let generator = Arc::new(MockTextGenerator::new().with_failure("model exploded"));
    let config = product_config();
    let pipeline = Arc::new(
        RetrievalPipeline::builder()
            .config(config.clone())
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(512)))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(Arc::new(FixedSizeChunker::new(20, 5)))
            .build()
            .unwrap(),
    );
    let assistant = RagAssistant::builder()
        .config(config)
        .pipeline(pipeline)
        .generator(generator)
        .events(tx)
        .build()
        .unwrap();
    assistant.init().await.unwrap();
    assistant.ingest_text("products", PRODUCT_DATA).await.unwrap();

    assistant.chat("s1", "How much is Product A?").await.unwrap_err();

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(last, Some(TurnEvent::Failed { .. })));
}
