//! In-memory session store keyed by `(channel_type, chat_id)`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::session::{AgentSession, SharedSession};

/// Resolves the session for an incoming message, creating one on
/// first contact. Persistent storage lives behind a separate
/// collaborator; this store is the in-process source of truth for
/// live sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<(String, String), SharedSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve or create the session for `(channel_type, chat_id)`.
    pub fn get_or_create(&self, channel_type: &str, chat_id: &str) -> SharedSession {
        let key = (channel_type.to_owned(), chat_id.to_owned());

        // Fast path: session already exists.
        {
            let sessions = self.sessions.read();
            if let Some(session) = sessions.get(&key) {
                return session.clone();
            }
        }

        // Slow path: create under the write lock, rechecking for a
        // racing creator.
        let mut sessions = self.sessions.write();
        sessions
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(channel_type, chat_id, "creating session");
                AgentSession::new(channel_type, chat_id).into_shared()
            })
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}
