//! Configuration for the assistant and its retrieval pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// What the orchestrator does when query reformulation fails.
///
/// The policy is explicit configuration rather than an implicit catch:
/// either the raw user input is retrieved against as-is (with a warning),
/// or the turn fails with a `Reformulation` error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReformulationFallback {
    /// Log a warning and retrieve with the raw user input.
    #[default]
    UseRawInput,
    /// Fail the turn.
    Fail,
}

/// Configuration parameters for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Maximum number of chunks returned per retrieval.
    pub top_k: usize,
    /// Minimum similarity score for retrieved chunks.
    pub score_threshold: f32,
    /// Maximum tokens per generation call.
    pub max_tokens: u32,
    /// Sampling temperature for generation calls.
    pub temperature: f32,
    /// Timeout for each external call (embedding, generation), in milliseconds.
    pub timeout_ms: u64,
    /// Sentence budget stated in the answer instruction.
    pub max_answer_sentences: usize,
    /// Reply used when no context chunk meets the score threshold.
    pub no_context_reply: String,
    /// Policy when reformulation fails.
    pub reformulation_fallback: ReformulationFallback,
    /// Retries per external operation for transient failures.
    pub max_retries: u32,
    /// Fixed backoff between retries, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            score_threshold: 0.3,
            max_tokens: 512,
            temperature: 0.0,
            timeout_ms: 30_000,
            max_answer_sentences: 3,
            no_context_reply: "I don't have that information.".to_string(),
            reformulation_fallback: ReformulationFallback::default(),
            max_retries: 1,
            retry_backoff_ms: 250,
        }
    }
}

impl AssistantConfig {
    /// Create a new builder for constructing an [`AssistantConfig`].
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// The per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The retry backoff as a [`Duration`].
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Builder for constructing a validated [`AssistantConfig`].
#[derive(Debug, Clone, Default)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the maximum number of chunks returned per retrieval.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score for retrieved chunks.
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.config.score_threshold = threshold;
        self
    }

    /// Set the maximum tokens per generation call.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature for generation calls.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the per-call timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Set the sentence budget stated in the answer instruction.
    pub fn max_answer_sentences(mut self, sentences: usize) -> Self {
        self.config.max_answer_sentences = sentences;
        self
    }

    /// Set the reply used when no context meets the score threshold.
    pub fn no_context_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.no_context_reply = reply.into();
        self
    }

    /// Set the policy applied when reformulation fails.
    pub fn reformulation_fallback(mut self, fallback: ReformulationFallback) -> Self {
        self.config.reformulation_fallback = fallback;
        self
    }

    /// Set the number of retries per external operation.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the fixed backoff between retries in milliseconds.
    pub fn retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.config.retry_backoff_ms = backoff_ms;
        self
    }

    /// Build the [`AssistantConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if:
    /// - `chunk_overlap >= chunk_size` (the split would not terminate)
    /// - `top_k == 0`
    /// - `timeout_ms == 0`
    pub fn build(self) -> Result<AssistantConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(AssistantError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(AssistantError::Config("top_k must be greater than zero".to_string()));
        }
        if self.config.timeout_ms == 0 {
            return Err(AssistantError::Config("timeout_ms must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}
