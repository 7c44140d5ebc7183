//! Deterministic mock providers for tests, examples, and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{AssistantError, Result};
use crate::generation::{GenerationOptions, Message, Role, TextGenerator};

/// FNV-1a hash of a token.
fn hash_token(token: &str) -> u64 {
    token
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3))
}

/// A deterministic [`EmbeddingProvider`] with no model behind it.
///
/// Embeds text as an L2-normalized bag-of-words vector: each lowercased
/// alphanumeric token bumps one hash-selected component. Cosine similarity
/// between two embeddings then reflects token overlap, which is enough for
/// retrieval tests to behave like a (crude) semantic search.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl MockEmbeddingProvider {
    /// Create a provider producing vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let index = (hash_token(token) % self.dimensions as u64) as usize;
            embedding[index] += 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// One scripted reply for [`MockTextGenerator`].
#[derive(Debug, Clone)]
enum ScriptedReply {
    Reply(String),
    Failure(String),
}

/// A scripted [`TextGenerator`] for tests.
///
/// Replies are popped from a queue in order; a queued failure yields a
/// `Generation` error. When the queue is empty the generator echoes the last
/// user message, which keeps unscripted calls deterministic. Every request
/// is recorded for later inspection, and an optional latency simulates a
/// slow provider.
#[derive(Debug, Default)]
pub struct MockTextGenerator {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<Vec<Message>>>,
    latency: Option<Duration>,
}

impl MockTextGenerator {
    /// Create a generator with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.script.lock().expect("script lock").push_back(ScriptedReply::Reply(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script.lock().expect("script lock").push_back(ScriptedReply::Failure(message.into()));
        self
    }

    /// Delay every call by the given duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The message sequences of all calls made so far.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// The number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, messages: &[Message], _options: GenerationOptions) -> Result<String> {
        self.requests.lock().expect("requests lock").push(messages.to_vec());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Failure(message)) => Err(AssistantError::Generation(message)),
            None => Ok(messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default()),
        }
    }
}
