//! Conversation sessions and their registry.
//!
//! A [`Session`] is an ordered, append-only log of [`Turn`]s keyed by an
//! opaque identifier supplied by the caller. History is never reordered or
//! implicitly deleted; only [`Session::clear`] (or removing the session from
//! the registry) discards it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::generation::Role;

/// One utterance in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Who authored the turn (user or assistant).
    pub role: Role,
    /// The turn text.
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: Utc::now() }
    }

    /// Create an assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Utc::now() }
    }
}

/// An isolated conversation history.
///
/// The turn log is protected by its own lock; a separate gate mutex
/// serializes whole turns so that two requests for the same session can
/// never interleave their history writes.
#[derive(Debug)]
pub struct Session {
    id: String,
    turns: RwLock<Vec<Turn>>,
    gate: Mutex<()>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), turns: RwLock::new(Vec::new()), gate: Mutex::new(()) }
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire the turn gate. Held for the duration of one chat turn;
    /// tokio's mutex is fair, so contending turns proceed in submission order.
    pub async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// A snapshot of the history in insertion order.
    pub async fn history(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }

    /// The number of recorded turns.
    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    /// Whether the history is empty.
    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }

    /// Append a turn to the history.
    pub async fn append(&self, turn: Turn) {
        self.turns.write().await.push(turn);
    }

    /// Discard the history. The session itself stays registered.
    pub async fn clear(&self) {
        self.turns.write().await.clear();
    }
}

/// Owner of all sessions, keyed by their opaque identifiers.
///
/// Sessions are created on first reference and never implicitly destroyed.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session, creating it if this is the first reference.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return Arc::clone(session);
            }
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Session::new(session_id))),
        )
    }

    /// Fetch an existing session.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).map(Arc::clone)
    }

    /// Clear a session's history. Returns false if the session is unknown.
    pub async fn clear(&self, session_id: &str) -> bool {
        let session = self.get(session_id).await;
        match session {
            Some(session) => {
                session.clear().await;
                true
            }
            None => false,
        }
    }

    /// Remove a session entirely. Returns false if the session is unknown.
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// The number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry has no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
