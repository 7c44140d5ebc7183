//! The chat orchestrator.
//!
//! [`RagAssistant`] serves one request/response cycle per user turn:
//! reformulate the input against the session history, retrieve context,
//! generate an answer, and commit both turns to the history. Turns within
//! one session run strictly sequentially; different sessions proceed
//! independently.

use std::future::Future;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::answer::AnswerGenerator;
use crate::config::{AssistantConfig, ReformulationFallback};
use crate::document::{Chunk, Document, SearchResult};
use crate::error::{AssistantError, Result};
use crate::event::{EventSender, TurnEvent};
use crate::generation::TextGenerator;
use crate::pipeline::RetrievalPipeline;
use crate::reformulate::QueryReformulator;
use crate::session::{SessionRegistry, Turn};

/// The result of one successful chat turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The generated answer.
    pub answer: String,
    /// The standalone query that was retrieved against (the raw input when
    /// no reformulation was needed or the fallback policy applied).
    pub standalone_query: String,
    /// The context chunks the answer was grounded in, by descending score.
    pub sources: Vec<SearchResult>,
}

/// Retrieval-augmented chat assistant with conversational history.
///
/// Composes a [`RetrievalPipeline`], a [`QueryReformulator`], an
/// [`AnswerGenerator`], and a [`SessionRegistry`]. Construct one via
/// [`RagAssistant::builder()`].
///
/// # Cancellation
///
/// Dropping the future returned by [`chat`](RagAssistant::chat) abandons the
/// turn: in-flight provider calls are dropped (the provider may still finish
/// server-side) and nothing is appended to the session history, which only
/// happens after a successful generation.
pub struct RagAssistant {
    config: AssistantConfig,
    pipeline: Arc<RetrievalPipeline>,
    reformulator: QueryReformulator,
    answerer: AnswerGenerator,
    sessions: SessionRegistry,
    collection: String,
    events: Option<EventSender>,
}

impl RagAssistant {
    /// Create a new [`RagAssistantBuilder`].
    pub fn builder() -> RagAssistantBuilder {
        RagAssistantBuilder::default()
    }

    /// The assistant configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// The session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The retrieval pipeline.
    pub fn pipeline(&self) -> &Arc<RetrievalPipeline> {
        &self.pipeline
    }

    /// Create the assistant's collection in the vector store.
    pub async fn init(&self) -> Result<()> {
        self.pipeline.create_collection(&self.collection).await
    }

    /// Ingest a document into the assistant's collection.
    pub async fn ingest_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        self.pipeline.ingest(&self.collection, document).await
    }

    /// Ingest raw text into the assistant's collection.
    pub async fn ingest_text(&self, document_id: &str, text: &str) -> Result<Vec<Chunk>> {
        self.pipeline.ingest_text(&self.collection, document_id, text).await
    }

    /// Serve one chat turn for the given session.
    ///
    /// Phases: reformulate → retrieve → generate → commit. The user and
    /// assistant turns are appended to the history only when the whole turn
    /// succeeds; any failure leaves the history unchanged.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::InvalidArgument`] for blank input.
    /// - [`AssistantError::Reformulation`] when reformulation fails and the
    ///   configured policy is [`ReformulationFallback::Fail`].
    /// - [`AssistantError::Generation`] when answer generation fails after
    ///   retries; terminal for the turn.
    /// - Retrieval errors ([`AssistantError::RetrievalTimeout`],
    ///   [`AssistantError::Embedding`], [`AssistantError::VectorStore`]).
    pub async fn chat(&self, session_id: &str, user_input: &str) -> Result<TurnOutcome> {
        if user_input.trim().is_empty() {
            return Err(AssistantError::InvalidArgument("user input is empty".to_string()));
        }

        let session = self.sessions.get_or_create(session_id).await;
        // Serializes turns within the session; held until the turn commits
        // or fails. The gate is fair, so queued turns run in submission order.
        let _gate = session.begin_turn().await;

        self.emit(TurnEvent::Started { session_id: session_id.to_string() });
        let history = session.history().await;

        let standalone_query = match self
            .retrying(|| self.reformulator.reformulate(&history, user_input))
            .await
        {
            Ok(query) => query,
            Err(e) if self.config.reformulation_fallback == ReformulationFallback::UseRawInput => {
                warn!(session_id, error = %e, "reformulation failed, retrieving with raw input");
                user_input.to_string()
            }
            Err(e) => return Err(self.fail(session_id, e)),
        };
        self.emit(TurnEvent::QueryReformulated {
            session_id: session_id.to_string(),
            query: standalone_query.clone(),
        });

        let sources = match self
            .retrying(|| self.pipeline.retrieve(&self.collection, &standalone_query))
            .await
        {
            Ok(sources) => sources,
            Err(e) => return Err(self.fail(session_id, e)),
        };
        self.emit(TurnEvent::ContextRetrieved {
            session_id: session_id.to_string(),
            result_count: sources.len(),
        });

        let answer = match self
            .retrying(|| self.answerer.generate(&history, &standalone_query, &sources))
            .await
        {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(session_id, e)),
        };

        session.append(Turn::user(user_input)).await;
        session.append(Turn::assistant(&answer)).await;

        info!(session_id, sources = sources.len(), "turn completed");
        self.emit(TurnEvent::Completed {
            session_id: session_id.to_string(),
            answer: answer.clone(),
        });

        Ok(TurnOutcome { answer, standalone_query, sources })
    }

    /// Run an operation under the configured retry policy: up to
    /// `max_retries` re-attempts with a fixed backoff, for retryable errors
    /// only.
    async fn retrying<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!(error = %e, attempt, "transient failure, retrying");
                    sleep(self.config.retry_backoff()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fail(&self, session_id: &str, e: AssistantError) -> AssistantError {
        error!(session_id, error = %e, "turn failed");
        self.emit(TurnEvent::Failed { session_id: session_id.to_string(), error: e.to_string() });
        e
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Builder for constructing a [`RagAssistant`].
///
/// `pipeline` and `generator` are required; `collection` defaults to
/// `"documents"` and `events` is optional.
#[derive(Default)]
pub struct RagAssistantBuilder {
    config: Option<AssistantConfig>,
    pipeline: Option<Arc<RetrievalPipeline>>,
    generator: Option<Arc<dyn TextGenerator>>,
    collection: Option<String>,
    events: Option<EventSender>,
}

impl RagAssistantBuilder {
    /// Set the assistant configuration. Defaults to the pipeline's
    /// configuration when omitted.
    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the retrieval pipeline.
    pub fn pipeline(mut self, pipeline: Arc<RetrievalPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the text-generation provider used for reformulation and answering.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the vector store collection the assistant retrieves from.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Attach a lifecycle event sender.
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the [`RagAssistant`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if `pipeline` or `generator` is
    /// missing.
    pub fn build(self) -> Result<RagAssistant> {
        let pipeline = self
            .pipeline
            .ok_or_else(|| AssistantError::Config("pipeline is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| AssistantError::Config("generator is required".to_string()))?;
        let config = self.config.unwrap_or_else(|| pipeline.config().clone());

        Ok(RagAssistant {
            reformulator: QueryReformulator::new(Arc::clone(&generator), config.clone()),
            answerer: AnswerGenerator::new(generator, config.clone()),
            sessions: SessionRegistry::new(),
            collection: self.collection.unwrap_or_else(|| "documents".to_string()),
            events: self.events,
            pipeline,
            config,
        })
    }
}
