//! Per-session cancellation tokens.
//!
//! Each running turn gets a [`CancelToken`]. Signalling it stops the
//! tool loop between iterations; in-flight external calls complete but
//! their results are discarded with the turn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation token checked by the tool loop.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks active cancellation tokens per `(channel_type, chat_id)`.
pub struct CancelMap {
    tokens: Mutex<HashMap<(String, String), CancelToken>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Create and register a new cancel token for a session.
    pub fn register(&self, channel_type: &str, chat_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .insert((channel_type.to_owned(), chat_id.to_owned()), token.clone());
        token
    }

    /// Cancel a running turn. Returns true if a token was found.
    pub fn cancel(&self, channel_type: &str, chat_id: &str) -> bool {
        match self
            .tokens
            .lock()
            .get(&(channel_type.to_owned(), chat_id.to_owned()))
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the token for a session (called when a turn completes).
    pub fn remove(&self, channel_type: &str, chat_id: &str) {
        self.tokens
            .lock()
            .remove(&(channel_type.to_owned(), chat_id.to_owned()));
    }

    pub fn is_running(&self, channel_type: &str, chat_id: &str) -> bool {
        self.tokens
            .lock()
            .contains_key(&(channel_type.to_owned(), chat_id.to_owned()))
    }
}
