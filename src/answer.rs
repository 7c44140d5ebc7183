//! Context-constrained answer generation.
//!
//! [`AnswerGenerator`] builds one generation request from a fixed system
//! instruction, the ordered chat history, the (standalone) query, and the
//! concatenated retrieved context, and returns the model's reply verbatim
//! apart from whitespace trimming.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::debug;

use crate::config::AssistantConfig;
use crate::document::SearchResult;
use crate::error::{AssistantError, Result};
use crate::generation::{GenerationOptions, Message, TextGenerator};
use crate::session::Turn;

/// Generates answers grounded in retrieved context.
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
    config: AssistantConfig,
}

impl AnswerGenerator {
    /// Create an answer generator over the given text generator.
    pub fn new(generator: Arc<dyn TextGenerator>, config: AssistantConfig) -> Self {
        Self { generator, config }
    }

    fn instruction(&self, context: &str) -> String {
        format!(
            "You are a helpful assistant. Use only the provided context to answer questions \
             accurately. If the answer isn't clear from the context, say \"{}\". Limit your \
             response to {} concise sentences.\n\nContext:\n{context}",
            self.config.no_context_reply, self.config.max_answer_sentences
        )
    }

    /// Generate an answer for `query` from the retrieved `context`.
    ///
    /// With no context chunks the configured `no_context_reply` is returned
    /// directly, without a model call: an answer fabricated from outside the
    /// context can never be produced for an empty retrieval.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Generation`] if the generation call fails
    /// or times out. This error is terminal for the turn.
    pub async fn generate(
        &self,
        history: &[Turn],
        query: &str,
        context: &[SearchResult],
    ) -> Result<String> {
        if context.is_empty() {
            debug!("no context met the score threshold, returning the configured reply");
            return Ok(self.config.no_context_reply.clone());
        }

        let context_text: Vec<&str> = context.iter().map(|r| r.chunk.text.as_str()).collect();
        let context_text = context_text.join("\n\n");

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.instruction(&context_text)));
        messages.extend(history.iter().map(|turn| Message {
            role: turn.role,
            content: turn.content.clone(),
        }));
        messages.push(Message::user(query));

        let options = GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let answer = timeout(self.config.timeout(), self.generator.generate(&messages, options))
            .await
            .map_err(|_| {
                AssistantError::Generation(format!(
                    "generation timed out after {} ms",
                    self.config.timeout_ms
                ))
            })?
            .map_err(|e| AssistantError::Generation(e.to_string()))?;

        Ok(answer.trim().to_string())
    }
}
