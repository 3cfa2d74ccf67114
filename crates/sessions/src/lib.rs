//! Session state: the in-memory session store, the history writer
//! that owns all appends to raw history, and per-session run locks.

pub mod lock;
pub mod session;
pub mod store;
pub mod writer;

pub use lock::{SessionBusy, SessionLockMap};
pub use session::{AgentSession, SharedSession};
pub use store::SessionStore;
pub use writer::{Clock, HistoryWriter, SystemClock};
