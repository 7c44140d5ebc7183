//! Turn lifecycle events.
//!
//! The orchestrator emits one event per phase of a chat turn to an optional
//! unbounded channel. UIs subscribe to render progress ("thinking…",
//! retrieved context, final answer) without the core depending on any
//! particular toolkit. Emission is best-effort: a dropped receiver never
//! fails a turn.

use serde::Serialize;
use tokio::sync::mpsc;

/// A discrete lifecycle event for one chat turn.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    /// The turn was accepted and holds the session's turn gate.
    Started {
        /// The session the turn belongs to.
        session_id: String,
    },
    /// The user input was rewritten into a standalone query (or passed
    /// through unchanged).
    QueryReformulated {
        /// The session the turn belongs to.
        session_id: String,
        /// The query that will be retrieved against.
        query: String,
    },
    /// Context retrieval finished.
    ContextRetrieved {
        /// The session the turn belongs to.
        session_id: String,
        /// How many chunks met the score threshold.
        result_count: usize,
    },
    /// The turn completed and both turns were appended to history.
    Completed {
        /// The session the turn belongs to.
        session_id: String,
        /// The final answer text.
        answer: String,
    },
    /// The turn failed; history was left untouched.
    Failed {
        /// The session the turn belongs to.
        session_id: String,
        /// A rendering of the error.
        error: String,
    },
}

/// Sending half of the turn event channel.
pub type EventSender = mpsc::UnboundedSender<TurnEvent>;

/// Receiving half of the turn event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<TurnEvent>;

/// Create an unbounded turn event channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
