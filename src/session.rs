//! Conversation sessions and the process-wide session store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::persona::CaseStudy;

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// A single role-tagged message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// System instruction turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User utterance turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant reply turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One ongoing conversation: history, persona, and token accounting
#[derive(Debug)]
pub struct Session {
    case_study: CaseStudy,
    history: Vec<Turn>,
    tokens_used: u32,
}

impl Session {
    /// Create a session seeded with the persona's system turn
    #[must_use]
    pub fn new(case_study: CaseStudy) -> Self {
        Self {
            case_study,
            history: vec![Turn::system(case_study.persona().system_prompt)],
            tokens_used: 0,
        }
    }

    /// The case study this session rehearses against
    #[must_use]
    pub const fn case_study(&self) -> CaseStudy {
        self.case_study
    }

    /// Ordered conversation history; the first turn is always the system turn
    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(Turn::assistant(content));
    }

    /// Cap the history at `max_messages`, dropping the oldest non-system
    /// turns first. The system turn and the most recent turns survive, in
    /// original order. A cap of zero disables trimming.
    pub fn trim_history(&mut self, max_messages: usize) {
        if max_messages == 0 || self.history.len() <= max_messages {
            return;
        }
        let tail_start = self.history.len() - (max_messages - 1);
        let mut trimmed = Vec::with_capacity(max_messages);
        trimmed.push(self.history[0].clone());
        trimmed.extend(self.history.drain(tail_start..));
        self.history = trimmed;
    }

    /// Charge tokens consumed by a capability call; the total only grows
    pub fn add_tokens(&mut self, tokens: u32) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    /// Cumulative tokens consumed over this session's lifetime
    #[must_use]
    pub const fn tokens_used(&self) -> u32 {
        self.tokens_used
    }
}

/// A session handle; the per-session mutex serializes turns so only one is
/// in flight for a given session id at a time
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Process-wide mapping from session id to conversation state.
///
/// The map itself is guarded by a std mutex held only for lookups; each
/// session carries its own async mutex, so turns for one session queue
/// while turns for different sessions proceed in parallel. Sessions live
/// until reset or process exit; nothing is persisted.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `session_id`, creating it (seeded with the
    /// case study's system turn) on first reference.
    pub fn get_or_create(&self, session_id: &str, case_study: CaseStudy) -> SharedSession {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        if let Some(session) = sessions.get(session_id) {
            return Arc::clone(session);
        }
        tracing::debug!(session_id, case_study = %case_study, "creating session");
        let session = Arc::new(tokio::sync::Mutex::new(Session::new(case_study)));
        sessions.insert(session_id.to_string(), Arc::clone(&session));
        session
    }

    /// Discard a session entirely; a no-op when absent.
    ///
    /// A turn already in flight finishes against the orphaned state and is
    /// dropped with it; the next turn for the id starts fresh.
    pub fn reset(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        if sessions.remove(session_id).is_some() {
            tracing::info!(session_id, "session reset");
        }
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map poisoned").len()
    }

    /// Whether the store holds no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
