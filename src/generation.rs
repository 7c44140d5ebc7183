//! Text-generation provider trait and chat message types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a chat [`Message`] or conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A fixed instruction to the model.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
}

/// One entry in an ordered generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A provider that generates text from an ordered sequence of messages.
///
/// Consumed by the query reformulator and the answer generator; any concrete
/// vendor binding is an adapter behind this trait, swappable without touching
/// the orchestrator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A short backend name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for the given messages.
    async fn generate(&self, messages: &[Message], options: GenerationOptions) -> Result<String>;
}
