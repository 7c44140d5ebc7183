//! History-aware query reformulation.
//!
//! A follow-up like "what about B?" is useless as a retrieval query on its
//! own. [`QueryReformulator`] rewrites it into a standalone query using the
//! chat history, via one generation call. The model output is used purely as
//! a query string and is never rendered as an answer.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::debug;

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::generation::{GenerationOptions, Message, TextGenerator};
use crate::session::Turn;

/// Instruction for the reformulation call. Forbids answering so the output
/// stays a query.
const REFORMULATE_INSTRUCTION: &str = "You are a helpful assistant that reformulates user \
    questions based on the chat history so they can be used for retrieval. Do NOT answer \
    the question, only rewrite it as a standalone query.";

/// Rewrites follow-up questions into standalone retrieval queries.
pub struct QueryReformulator {
    generator: Arc<dyn TextGenerator>,
    config: AssistantConfig,
}

impl QueryReformulator {
    /// Create a reformulator over the given text generator.
    pub fn new(generator: Arc<dyn TextGenerator>, config: AssistantConfig) -> Self {
        Self { generator, config }
    }

    /// Rewrite `raw_input` into a standalone query given the chat history.
    ///
    /// With empty history there is nothing to resolve, so the input is
    /// returned unchanged without a model call.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Reformulation`] if the generation call
    /// fails, times out, or produces an empty rewrite. The orchestrator
    /// decides whether to fall back to the raw input.
    pub async fn reformulate(&self, history: &[Turn], raw_input: &str) -> Result<String> {
        if history.is_empty() {
            debug!("empty history, using raw input as query");
            return Ok(raw_input.to_string());
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(REFORMULATE_INSTRUCTION));
        messages.extend(history.iter().map(|turn| Message {
            role: turn.role,
            content: turn.content.clone(),
        }));
        messages.push(Message::user(raw_input));

        let options = GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let rewritten = timeout(self.config.timeout(), self.generator.generate(&messages, options))
            .await
            .map_err(|_| {
                AssistantError::Reformulation(format!(
                    "reformulation timed out after {} ms",
                    self.config.timeout_ms
                ))
            })?
            .map_err(|e| AssistantError::Reformulation(e.to_string()))?;

        let rewritten = rewritten.trim().to_string();
        if rewritten.is_empty() {
            return Err(AssistantError::Reformulation("model returned an empty rewrite".to_string()));
        }

        debug!(query = %rewritten, "reformulated follow-up question");
        Ok(rewritten)
    }
}
